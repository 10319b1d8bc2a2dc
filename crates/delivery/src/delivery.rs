//! Module for control point data and the delivery normaliser

// crate modules
use crate::error::{Error, Result};

// external crates
use log::{debug, warn};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis};

/// A beam delivery as a sequence of control points
///
/// Holds the cumulative monitor units, MLC positions and jaw positions for
/// `N` control points and `K` leaf pairs:
///
/// - `mu` has shape `(N)` and never decreases
/// - `mlc` has shape `(N, K, 2)`, left then right bank
/// - `jaw` has shape `(N, 2)`, bottom then top diaphragm
///
/// Every position is a positive distance from the central axis towards the
/// side that owns the leaf or jaw. A left leaf stored as `30.0` therefore has
/// its tip 30 mm left of centre, and a negative value means overtravel past
/// the central axis.
///
/// The shape and monotonic MU are checked once on construction, so anything
/// holding a [Delivery] may rely on them.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    mu: Array1<f64>,
    mlc: Array3<f64>,
    jaw: Array2<f64>,
}

impl Delivery {
    /// Create a new delivery from control point arrays
    ///
    /// ```rust
    /// # use mutools_delivery::Delivery;
    /// # use ndarray::{array, Array3};
    /// let mu = array![0.0, 100.0];
    /// let mlc = Array3::from_elem((2, 3, 2), 10.0);
    /// let jaw = array![[7.5, 7.5], [7.5, 7.5]];
    ///
    /// let delivery = Delivery::new(mu, mlc, jaw).unwrap();
    /// assert_eq!(delivery.number_of_leaf_pairs(), 3);
    /// assert_eq!(delivery.total_mu(), 100.0);
    /// ```
    ///
    /// Fails for fewer than 2 control points, inconsistent shapes, undefined
    /// values, or monitor units that are negative or decreasing.
    pub fn new(mu: Array1<f64>, mlc: Array3<f64>, jaw: Array2<f64>) -> Result<Self> {
        let delivery = Self { mu, mlc, jaw };
        delivery.check_shapes()?;
        delivery.check_values()?;
        delivery.warn_crossed_jaws();
        Ok(delivery)
    }

    /// Create a new delivery from nested vectors
    ///
    /// Convenient for small hand-written deliveries. The MLC is indexed as
    /// `mlc[control_point][leaf_pair] = [left, right]` and the jaws as
    /// `jaw[control_point] = [bottom, top]`.
    ///
    /// ```rust
    /// # use mutools_delivery::Delivery;
    /// let delivery = Delivery::from_vecs(
    ///     vec![0.0, 100.0],
    ///     vec![vec![[5.0, 5.0], [5.0, 5.0]]; 2],
    ///     vec![[5.0, 5.0]; 2],
    /// ).unwrap();
    ///
    /// assert_eq!(delivery.len(), 2);
    /// assert_eq!(delivery.mlc()[[1, 0, 1]], 5.0);
    /// ```
    pub fn from_vecs(mu: Vec<f64>, mlc: Vec<Vec<[f64; 2]>>, jaw: Vec<[f64; 2]>) -> Result<Self> {
        let n_leaves = mlc.first().map(|cp| cp.len()).unwrap_or(0);

        if let Some(cp) = mlc.iter().find(|cp| cp.len() != n_leaves) {
            return Err(Error::LeafPairMismatch {
                expected: n_leaves,
                found: cp.len(),
            });
        }

        let mlc = Array3::from_shape_fn((mlc.len(), n_leaves, 2), |(i, k, b)| mlc[i][k][b]);
        let jaw = Array2::from_shape_fn((jaw.len(), 2), |(i, b)| jaw[i][b]);

        Self::new(Array1::from(mu), mlc, jaw)
    }

    /// Cumulative monitor units at each control point
    pub fn mu(&self) -> ArrayView1<f64> {
        self.mu.view()
    }

    /// MLC positions indexed as `[control point, leaf pair, bank]`
    pub fn mlc(&self) -> ArrayView3<f64> {
        self.mlc.view()
    }

    /// Jaw positions indexed as `[control point, diaphragm]`
    pub fn jaw(&self) -> ArrayView2<f64> {
        self.jaw.view()
    }

    /// Number of control points
    pub fn len(&self) -> usize {
        self.mu.len()
    }

    /// Always false for a valid delivery, provided for completeness
    pub fn is_empty(&self) -> bool {
        self.mu.is_empty()
    }

    /// Number of leaf pairs in the MLC
    pub fn number_of_leaf_pairs(&self) -> usize {
        self.mlc.len_of(Axis(1))
    }

    /// Monitor units delivered over the whole beam
    pub fn total_mu(&self) -> f64 {
        self.mu[self.len() - 1] - self.mu[0]
    }

    /// Drop control points that contribute nothing to the delivery
    ///
    /// A control point with the same MU as both of its neighbours sits inside
    /// a plateau. Any motion through it happens with the beam off, so only
    /// the plateau end points matter. The first and last control points are
    /// always kept.
    ///
    /// ```rust
    /// # use mutools_delivery::Delivery;
    /// let delivery = Delivery::from_vecs(
    ///     vec![0.0, 0.0, 0.0, 10.0, 10.0],
    ///     vec![vec![[1.0, 1.0]]; 5],
    ///     vec![[5.0, 5.0]; 5],
    /// ).unwrap();
    ///
    /// let normalised = delivery.remove_irrelevant_control_points();
    /// assert_eq!(normalised.mu().to_vec(), vec![0.0, 0.0, 10.0, 10.0]);
    /// ```
    pub fn remove_irrelevant_control_points(&self) -> Delivery {
        let keep = relevant_control_points(&self.mu.to_vec());
        let indices: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, &k)| k.then_some(i))
            .collect();

        debug!(
            "Kept {} of {} control points after removing MU plateaus",
            indices.len(),
            self.len()
        );

        Delivery {
            mu: self.mu.select(Axis(0), &indices),
            mlc: self.mlc.select(Axis(0), &indices),
            jaw: self.jaw.select(Axis(0), &indices),
        }
    }

    /// Split into two consecutive deliveries sharing one control point
    ///
    /// The first delivery ends at `control_point` and the second starts
    /// there, so every transition of the original belongs to exactly one of
    /// them. MU values are not rebased, only differences between control
    /// points are meaningful.
    ///
    /// ```rust
    /// # use mutools_delivery::Delivery;
    /// let delivery = Delivery::from_vecs(
    ///     vec![0.0, 20.0, 60.0],
    ///     vec![vec![[1.0, 1.0]]; 3],
    ///     vec![[5.0, 5.0]; 3],
    /// ).unwrap();
    ///
    /// let (first, second) = delivery.split_at(1).unwrap();
    /// assert_eq!(first.total_mu(), 20.0);
    /// assert_eq!(second.total_mu(), 40.0);
    /// ```
    pub fn split_at(&self, control_point: usize) -> Result<(Delivery, Delivery)> {
        let n = self.len();
        if control_point == 0 || control_point >= n - 1 {
            return Err(Error::ControlPointOutOfRange {
                index: control_point,
                length: n,
            });
        }

        let first = Delivery {
            mu: self.mu.slice(s![..=control_point]).to_owned(),
            mlc: self.mlc.slice(s![..=control_point, .., ..]).to_owned(),
            jaw: self.jaw.slice(s![..=control_point, ..]).to_owned(),
        };

        let second = Delivery {
            mu: self.mu.slice(s![control_point..]).to_owned(),
            mlc: self.mlc.slice(s![control_point.., .., ..]).to_owned(),
            jaw: self.jaw.slice(s![control_point.., ..]).to_owned(),
        };

        Ok((first, second))
    }

    /// Structural checks on the array dimensions
    fn check_shapes(&self) -> Result<()> {
        let n = self.mu.len();
        if n < 2 {
            return Err(Error::TooFewControlPoints { found: n });
        }

        let (n_mlc, n_leaves, n_banks) = self.mlc.dim();
        let (n_jaw, n_diaphragms) = self.jaw.dim();

        if n_mlc != n || n_jaw != n {
            return Err(Error::InconsistentControlPoints {
                mu: n,
                mlc: n_mlc,
                jaw: n_jaw,
            });
        }

        if n_banks != 2 {
            return Err(Error::UnexpectedMlcShape(n_banks));
        }

        if n_diaphragms != 2 {
            return Err(Error::UnexpectedJawShape(n_diaphragms));
        }

        if n_leaves == 0 {
            return Err(Error::NoLeafPairs);
        }

        Ok(())
    }

    /// Invariant checks on the values themselves
    fn check_values(&self) -> Result<()> {
        if self.mu.iter().any(|v| !v.is_finite()) {
            return Err(Error::UndefinedPosition("mu"));
        }
        if self.mlc.iter().any(|v| !v.is_finite()) {
            return Err(Error::UndefinedPosition("mlc"));
        }
        if self.jaw.iter().any(|v| !v.is_finite()) {
            return Err(Error::UndefinedPosition("jaw"));
        }

        if self.mu[0] < 0.0 {
            return Err(Error::NegativeMonitorUnits(self.mu[0]));
        }

        for (i, pair) in self.mu.windows(2).into_iter().enumerate() {
            if pair[1] < pair[0] {
                return Err(Error::DecreasingMonitorUnits {
                    index: i + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        Ok(())
    }

    /// Jaws that cross each other are odd but still computable
    fn warn_crossed_jaws(&self) {
        let crossed = self
            .jaw
            .outer_iter()
            .filter(|cp| cp[0] + cp[1] < 0.0)
            .count();

        if crossed > 0 {
            warn!("Jaws cross the central axis into each other at {crossed} control point(s)");
        }
    }
}

/// Mask of the control points that can contribute to a delivery
///
/// A control point is irrelevant when the MU is unchanged from both the
/// previous and the next control point. The first and last are always
/// relevant.
///
/// ```rust
/// # use mutools_delivery::relevant_control_points;
/// let mu = [0.0, 5.0, 5.0, 5.0, 5.0, 8.0];
/// assert_eq!(
///     relevant_control_points(&mu),
///     vec![true, true, false, false, true, true]
/// );
/// ```
pub fn relevant_control_points(mu: &[f64]) -> Vec<bool> {
    let n = mu.len();
    (0..n)
        .map(|i| {
            if i == 0 || i + 1 >= n {
                return true;
            }
            !(mu[i - 1] == mu[i] && mu[i] == mu[i + 1])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn simple(mu: Vec<f64>) -> Result<Delivery> {
        let n = mu.len();
        Delivery::from_vecs(mu, vec![vec![[2.0, 2.0]; 2]; n], vec![[5.0, 5.0]; n])
    }

    #[test]
    fn too_few_control_points() {
        assert!(matches!(
            simple(vec![0.0]),
            Err(Error::TooFewControlPoints { found: 1 })
        ));
    }

    #[test]
    fn decreasing_mu() {
        assert!(matches!(
            simple(vec![0.0, 10.0, 9.0]),
            Err(Error::DecreasingMonitorUnits { index: 2, .. })
        ));
    }

    #[test]
    fn negative_mu() {
        assert!(matches!(
            simple(vec![-1.0, 10.0]),
            Err(Error::NegativeMonitorUnits(_))
        ));
    }

    #[test]
    fn mismatched_control_points() {
        let result = Delivery::new(
            array![0.0, 1.0, 2.0],
            Array3::zeros((3, 4, 2)),
            Array2::zeros((2, 2)),
        );
        assert!(matches!(
            result,
            Err(Error::InconsistentControlPoints {
                mu: 3,
                mlc: 3,
                jaw: 2
            })
        ));
    }

    #[test]
    fn wrong_number_of_banks() {
        let result = Delivery::new(
            array![0.0, 1.0],
            Array3::zeros((2, 4, 3)),
            Array2::zeros((2, 2)),
        );
        assert!(matches!(result, Err(Error::UnexpectedMlcShape(3))));
    }

    #[test]
    fn ragged_leaf_pairs() {
        let result = Delivery::from_vecs(
            vec![0.0, 1.0],
            vec![vec![[1.0, 1.0]; 2], vec![[1.0, 1.0]; 3]],
            vec![[5.0, 5.0]; 2],
        );
        assert!(matches!(
            result,
            Err(Error::LeafPairMismatch {
                expected: 2,
                found: 3
            })
        ));
    }

    #[test]
    fn undefined_positions() {
        let result = Delivery::from_vecs(
            vec![0.0, 1.0],
            vec![vec![[f64::NAN, 1.0]]; 2],
            vec![[5.0, 5.0]; 2],
        );
        assert!(matches!(result, Err(Error::UndefinedPosition("mlc"))));
    }

    #[test]
    fn plateau_keeps_end_points() {
        let mask = relevant_control_points(&[0.0, 0.0, 0.0, 0.0]);
        assert_eq!(mask, vec![true, false, false, true]);
    }

    #[test]
    fn split_out_of_range() {
        let delivery = simple(vec![0.0, 1.0, 2.0]).unwrap();
        assert!(delivery.split_at(0).is_err());
        assert!(delivery.split_at(2).is_err());
        assert!(delivery.split_at(1).is_ok());
    }
}
