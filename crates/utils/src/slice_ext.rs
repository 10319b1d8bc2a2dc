use crate::error::{Error, Result};

/// Extends functionality for slices of float arrays
pub trait SliceExt<T> {
    /// Find the minimum value in float arrays
    ///
    /// Only provides the minimum value from a collection of valid numbers. Any
    /// NAN values, infinite values, or empty slices will return an error.
    ///
    /// ```rust
    /// # use mutools_utils::SliceExt;
    /// # use mutools_utils::Error;
    /// // Successful cases
    /// assert_eq!([1.1, 0.5, 2.2].try_min(), Ok(0.5));
    /// assert_eq!([1.1, f64::MIN, 2.2].try_min(), Ok(f64::MIN));
    ///
    /// // Error cases
    /// assert_eq!([1.1, f64::NAN, 2.2].try_min(), Err(Error::SliceContainsUndefinedValues));
    /// assert_eq!([1.1, f64::INFINITY, 2.2].try_min(), Err(Error::SliceContainsUndefinedValues));
    /// assert_eq!(Vec::<f64>::new().try_min(), Err(Error::SliceContainsNoValues));
    /// ```
    ///
    /// The float primitives (`f32`/`f64`) do not implement `Ord` due to `NaN`
    /// being incomparable. Calling `min()` on a collection of floats is
    /// therefore not implemented in the standard library.
    ///
    /// This extension uses `total_cmp` to always produce an ordering in
    /// accordance to the totalOrder predicate as defined in the IEEE 754 (2008
    /// revision) floating point standard.
    fn try_min(&self) -> Result<T>;

    /// Find the maximum value in float arrays
    ///
    /// Only provides the maximum value from a collection of valid numbers. Any
    /// NAN values, infinite values, or empty slices will return an error.
    ///
    /// ```rust
    /// # use mutools_utils::SliceExt;
    /// # use mutools_utils::Error;
    /// // Successful cases
    /// assert_eq!([1.1, 0.5, 2.2].try_max(), Ok(2.2));
    /// assert_eq!([1.1, f64::MAX, 2.2].try_max(), Ok(f64::MAX));
    ///
    /// // Error cases
    /// assert_eq!([1.1, f64::NAN, 2.2].try_max(), Err(Error::SliceContainsUndefinedValues));
    /// assert_eq!(Vec::<f64>::new().try_max(), Err(Error::SliceContainsNoValues));
    /// ```
    fn try_max(&self) -> Result<T>;

    /// Find the index of the value closest to `value`
    ///
    /// Ties are resolved in favour of the lowest index, so a grid row exactly
    /// half way between two leaf centres maps onto the lower leaf.
    ///
    /// ```rust
    /// # use mutools_utils::SliceExt;
    /// let leaf_centres = vec![-7.5, -2.5, 2.5, 7.5];
    ///
    /// assert_eq!(leaf_centres.find_nearest(-9.0), Ok(0));
    /// assert_eq!(leaf_centres.find_nearest(1.0), Ok(2));
    ///
    /// // Equidistant from -2.5 and 2.5, the lower index wins
    /// assert_eq!(leaf_centres.find_nearest(0.0), Ok(1));
    ///
    /// // Nothing to search
    /// assert!(Vec::<f64>::new().find_nearest(0.0).is_err());
    /// ```
    fn find_nearest(&self, value: T) -> Result<usize>;

    /// Find the index of the first value within an absolute tolerance
    ///
    /// Grid coordinates are built up from float steps, so exact equality is
    /// not reliable when lining up two grids with the same spacing.
    ///
    /// ```rust
    /// # use mutools_utils::SliceExt;
    /// let grid = vec![-1.0, 0.0, 1.0, 2.0];
    ///
    /// assert_eq!(grid.find_within(1.00001, 1e-4), Some(2));
    /// assert_eq!(grid.find_within(1.5, 1e-4), None);
    /// ```
    fn find_within(&self, value: T, tolerance: T) -> Option<usize>;
}

impl SliceExt<f64> for [f64] {
    fn try_min(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::SliceContainsUndefinedValues);
        };

        if let Some(v) = self.iter().min_by(|a, b| a.total_cmp(b)).copied() {
            Ok(v)
        } else {
            Err(Error::SliceContainsNoValues)
        }
    }

    fn try_max(&self) -> Result<f64> {
        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::SliceContainsUndefinedValues);
        };

        if let Some(v) = self.iter().max_by(|a, b| a.total_cmp(b)).copied() {
            Ok(v)
        } else {
            Err(Error::SliceContainsNoValues)
        }
    }

    fn find_nearest(&self, value: f64) -> Result<usize> {
        if !value.is_finite() {
            return Err(Error::UndefinedSearchValue);
        }

        if self.iter().any(|v| !v.is_finite()) {
            return Err(Error::SliceContainsUndefinedValues);
        };

        // strict comparison keeps the first of any equal distances
        let mut nearest: Option<(usize, f64)> = None;
        for (idx, v) in self.iter().enumerate() {
            let distance = (v - value).abs();
            match nearest {
                Some((_, best)) if distance >= best => (),
                _ => nearest = Some((idx, distance)),
            }
        }

        nearest
            .map(|(idx, _)| idx)
            .ok_or(Error::SliceContainsNoValues)
    }

    fn find_within(&self, value: f64, tolerance: f64) -> Option<usize> {
        self.iter().position(|v| (v - value).abs() < tolerance)
    }
}
