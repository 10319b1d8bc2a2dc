//! The MU density result and the ways it gets combined and exported

// standard library
use std::ops::{Add, Sub};
use std::path::Path;

// crate modules
use crate::error::{Error, Result};
use crate::grid::Grid;

// mutools modules
use mutools_utils::{f, ValueExt};

// external crates
use csv::WriterBuilder;
use log::debug;
use ndarray::{Array1, Array2};

/// MU delivered through every cell of a fixed grid
///
/// The density is indexed `[y, x]` to match the grid. Every density
/// calculated for the same machine and resolution shares the same grid, so
/// results for several deliveries can be summed, differenced, and compared
/// directly.
///
/// ```rust
/// # use mutools_mudensity::{Grid, MuDensity};
/// # use ndarray::array;
/// let grid = Grid { x: array![-1.0, 0.0, 1.0], y: array![0.0] };
/// let log_file = MuDensity::new(grid.clone(), array![[0.0, 9.0, 1.0]]).unwrap();
/// let plan = MuDensity::new(grid, array![[0.0, 10.0, 0.0]]).unwrap();
///
/// assert_eq!(log_file.total(), 10.0);
/// assert_eq!(log_file.comparison(&plan, None).unwrap(), 0.2);
///
/// let merged = (&log_file + &plan).unwrap();
/// assert_eq!(merged.max(), 19.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MuDensity {
    /// Cell centres the density is defined on
    pub grid: Grid,
    /// MU per cell, indexed `[y, x]`
    pub density: Array2<f64>,
}

impl MuDensity {
    /// Pair a density with its grid, the shapes must agree
    pub fn new(grid: Grid, density: Array2<f64>) -> Result<Self> {
        if density.dim() != grid.shape() {
            return Err(Error::MismatchedGrids);
        }
        Ok(Self { grid, density })
    }

    /// Cell centres along the leaf travel direction
    pub fn x(&self) -> &Array1<f64> {
        &self.grid.x
    }

    /// Cell centres along the jaw travel direction
    pub fn y(&self) -> &Array1<f64> {
        &self.grid.y
    }

    /// Full 2D coordinate arrays `(xx, yy)`, see [Grid::mesh]
    pub fn mesh(&self) -> (Array2<f64>, Array2<f64>) {
        self.grid.mesh()
    }

    /// Sum of the density over every cell
    pub fn total(&self) -> f64 {
        self.density.sum()
    }

    /// Largest density in any cell, zero for an empty grid
    pub fn max(&self) -> f64 {
        self.density.iter().copied().fold(0.0, f64::max)
    }

    /// Add another density on the same grid in place
    pub fn accumulate(&mut self, other: &MuDensity) -> Result<()> {
        self.check_grid(other)?;
        self.density += &other.density;
        Ok(())
    }

    /// Relative disagreement with a reference density
    ///
    /// This is `sum(|self - reference|) / normalisation`, and the
    /// normalisation defaults to the total of the reference. Zero means the
    /// two are identical.
    pub fn comparison(&self, reference: &MuDensity, normalisation: Option<f64>) -> Result<f64> {
        self.check_grid(reference)?;

        let normalisation = normalisation.unwrap_or_else(|| reference.total());
        if normalisation == 0.0 || !normalisation.is_finite() {
            return Err(Error::InvalidNormalisation(normalisation));
        }

        let difference: f64 = self
            .density
            .iter()
            .zip(reference.density.iter())
            .map(|(a, b)| (a - b).abs())
            .sum();

        Ok(difference / normalisation)
    }

    /// Write the density to a CSV file
    ///
    /// The first row holds the x coordinates and the first column the y
    /// coordinates, so every other row is one row of the grid.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = WriterBuilder::new().from_path(path)?;

        let header = std::iter::once("y\\x".to_string()).chain(self.x().iter().map(|x| f!("{x}")));
        writer.write_record(header)?;

        for (y, row) in self.y().iter().zip(self.density.rows()) {
            let record = std::iter::once(f!("{y}")).chain(row.iter().map(|v| f!("{v}")));
            writer.write_record(record)?;
        }

        writer.flush()?;
        debug!("Wrote MU density to {}", path.display());
        Ok(())
    }

    fn check_grid(&self, other: &MuDensity) -> Result<()> {
        if self.grid.matches(&other.grid) {
            Ok(())
        } else {
            Err(Error::MismatchedGrids)
        }
    }
}

impl std::fmt::Display for MuDensity {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let (rows, columns) = self.grid.shape();
        write!(
            f,
            "MuDensity {{ grid: {rows}x{columns}, total: {}, max: {} }}",
            self.total().sci(5, 2),
            self.max().sci(5, 2)
        )
    }
}

impl Add<&MuDensity> for &MuDensity {
    type Output = Result<MuDensity>;

    /// Merge two densities, for example the log files of separate fractions
    fn add(self, rhs: &MuDensity) -> Self::Output {
        self.check_grid(rhs)?;
        Ok(MuDensity {
            grid: self.grid.clone(),
            density: &self.density + &rhs.density,
        })
    }
}

impl Sub<&MuDensity> for &MuDensity {
    type Output = Result<MuDensity>;

    /// Cell-wise difference, for example a log file minus its plan
    fn sub(self, rhs: &MuDensity) -> Self::Output {
        self.check_grid(rhs)?;
        Ok(MuDensity {
            grid: self.grid.clone(),
            density: &self.density - &rhs.density,
        })
    }
}
