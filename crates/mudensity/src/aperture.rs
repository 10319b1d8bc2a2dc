//! Combine the edges of the aperture into an open fraction per cell
//!
//! The aperture is the intersection of the open sides of four edges, so a
//! cell is blocked whenever any one of them blocks it. The start and end
//! parts are combined separately with a maximum, then summed and capped.

// crate modules
use crate::error::{Error, Result};
use crate::kernel::BlockedFractions;

// external crates
use ndarray::{Array2, Array3, ArrayView1, ArrayView3, Axis, Dimension, Ix3, Zip};

/// Blocked fractions of all four edges for one batch of transitions
///
/// Leaf fractions are indexed `[transition, leaf pair, x]` over the touched
/// leaf pairs, and jaw fractions `[transition, 0, y]`.
#[derive(Debug)]
pub struct ApertureFractions {
    /// Left leaf of every touched leaf pair
    pub left: BlockedFractions,
    /// Right leaf of every touched leaf pair
    pub right: BlockedFractions,
    /// Bottom jaw
    pub bottom: BlockedFractions,
    /// Top jaw
    pub top: BlockedFractions,
}

impl ApertureFractions {
    /// Open fraction of every cell, indexed `[transition, y, x]`
    ///
    /// Leaf fractions are expanded onto the grid rows through `leaf_map`,
    /// and jaw fractions are broadcast along every row.
    pub fn open_fraction(&self, leaf_map: &[usize]) -> Result<Array3<f64>> {
        let start = self.combine(leaf_map, |f| &f.start)?;
        let end = self.combine(leaf_map, |f| &f.end)?;

        Ok(Zip::from(&start)
            .and(&end)
            .map_collect(|s, e| 1.0 - (s + e).min(1.0)))
    }

    /// Cell-wise maximum over the four edges for one part of the fraction
    fn combine<F>(&self, leaf_map: &[usize], part: F) -> Result<Array3<f64>>
    where
        F: Fn(&BlockedFractions) -> &Array3<f64>,
    {
        let left = part(&self.left).select(Axis(1), leaf_map);
        let right = part(&self.right).select(Axis(1), leaf_map);

        let shape = left.raw_dim();
        let bottom_rows = part(&self.bottom).view().permuted_axes([0, 2, 1]);
        let top_rows = part(&self.top).view().permuted_axes([0, 2, 1]);
        let bottom = broadcast_rows(&bottom_rows, shape)?;
        let top = broadcast_rows(&top_rows, shape)?;

        Ok(Zip::from(&left)
            .and(&right)
            .and(&bottom)
            .and(&top)
            .map_collect(|l, r, b, t| l.max(*r).max(*b).max(*t)))
    }
}

/// Stretch `[transition, y, 1]` jaw fractions along every row
fn broadcast_rows<'a>(rows: &'a ArrayView3<f64>, shape: Ix3) -> Result<ArrayView3<'a, f64>> {
    rows.broadcast(shape).ok_or_else(|| Error::FailedBroadcast {
        from: rows.shape().to_vec(),
        to: shape.slice().to_vec(),
    })
}

/// MU weighted sum of open fractions over the transitions of a batch
///
/// `delta_mu[t]` is the MU delivered during transition `t`.
pub fn weighted_open_fraction(open: ArrayView3<f64>, delta_mu: ArrayView1<f64>) -> Array2<f64> {
    let (_, rows, columns) = open.dim();
    let mut density = Array2::zeros((rows, columns));

    for (fraction, mu) in open.outer_iter().zip(delta_mu.iter()) {
        density.scaled_add(*mu, &fraction);
    }

    density
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array3};

    fn uniform(value: f64, shape: (usize, usize, usize)) -> BlockedFractions {
        BlockedFractions {
            start: Array3::from_elem(shape, value),
            end: Array3::from_elem(shape, value),
        }
    }

    #[test]
    fn maximum_over_edges() {
        // 1 transition, 2 leaf pairs, 3 columns, 4 rows
        let mut left = uniform(0.0, (1, 2, 3));
        left.start[[0, 1, 0]] = 0.3;
        let mut right = uniform(0.0, (1, 2, 3));
        right.end[[0, 1, 0]] = 0.4;
        let mut top = uniform(0.0, (1, 1, 4));
        top.start[[0, 0, 3]] = 1.0;
        top.end[[0, 0, 3]] = 1.0;
        let mut bottom = uniform(0.0, (1, 1, 4));
        bottom.start[[0, 0, 2]] = 0.1;

        let aperture = ApertureFractions {
            left,
            right,
            bottom,
            top,
        };

        let open = aperture.open_fraction(&[0, 0, 1, 1]).unwrap();
        assert_eq!(open.dim(), (1, 4, 3));

        // rows 0 and 1 map onto the first leaf pair, which is fully open
        assert_eq!(open[[0, 0, 0]], 1.0);
        assert_eq!(open[[0, 1, 2]], 1.0);

        // row 2: left start 0.3 beats the bottom jaw 0.1, plus right end 0.4
        assert!((open[[0, 2, 0]] - 0.3).abs() < 1e-12);
        assert!((open[[0, 2, 1]] - 0.9).abs() < 1e-12);

        // row 3 is behind the top jaw
        assert_eq!(open.index_axis(Axis(1), 3).sum(), 0.0);
    }

    #[test]
    fn mu_weighting() {
        let open = array![[[1.0, 0.5]], [[0.0, 0.25]]];
        let density = weighted_open_fraction(open.view(), array![10.0, 4.0].view());
        assert_eq!(density, array![[10.0, 6.0]]);
    }
}
