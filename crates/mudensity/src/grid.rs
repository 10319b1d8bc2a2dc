//! Calculation and output grids at the isocentre
//!
//! Two grids are involved in every calculation:
//!
//! - The **fixed** grid spans the whole machine, `[-max_leaf_gap/2,
//!   +max_leaf_gap/2]` in x and the full leaf bank in y. Every delivery on the
//!   same machine lands on exactly the same fixed grid, so results can be
//!   stacked or compared element-wise.
//! - The **calculation** grid only spans what the delivery actually opens,
//!   which keeps the swept-aperture tensors small.
//!
//! Both grids share the same spacing and the same y anchoring, a row sits
//! exactly on the centre of the middle leaf pair, so the calculation grid can
//! be pasted into the fixed grid by coordinate.

// standard library
use std::ops::RangeInclusive;

// mutools modules
use mutools_delivery::{Delivery, Machine};
use mutools_utils::SliceExt;

// crate modules
use crate::error::{Error, Result};

// external crates
use log::{debug, warn};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};

/// Coordinates are matched between grids within this tolerance (mm)
pub const GRID_TOLERANCE: f64 = 1e-4;

/// Cell centre coordinates of a rectangular grid (mm)
///
/// `x` runs along the MLC direction, left to right in the beam's eye view.
/// `y` runs along the jaw direction, increasing towards the top jaw. Arrays
/// defined on a grid are indexed `[y, x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Cell centres along the leaf travel direction
    pub x: Array1<f64>,
    /// Cell centres along the jaw travel direction
    pub y: Array1<f64>,
}

impl Grid {
    /// Shape of an array defined on this grid, `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.y.len(), self.x.len())
    }

    /// Full 2D coordinate arrays `(xx, yy)`, both indexed `[y, x]`
    ///
    /// ```rust
    /// # use mutools_mudensity::Grid;
    /// # use ndarray::array;
    /// let grid = Grid { x: array![-1.0, 0.0, 1.0], y: array![-0.5, 0.5] };
    /// let (xx, yy) = grid.mesh();
    ///
    /// assert_eq!(xx.row(1).to_vec(), vec![-1.0, 0.0, 1.0]);
    /// assert_eq!(yy.column(2).to_vec(), vec![-0.5, 0.5]);
    /// ```
    pub fn mesh(&self) -> (Array2<f64>, Array2<f64>) {
        let shape = self.shape();
        let xx = Array2::from_shape_fn(shape, |(_, i)| self.x[i]);
        let yy = Array2::from_shape_fn(shape, |(j, _)| self.y[j]);
        (xx, yy)
    }

    /// True if both grids have the same coordinates within [GRID_TOLERANCE]
    pub fn matches(&self, other: &Grid) -> bool {
        let close = |a: &Array1<f64>, b: &Array1<f64>| {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(u, v)| (u - v).abs() < GRID_TOLERANCE)
        };
        close(&self.x, &other.x) && close(&self.y, &other.y)
    }
}

/// The calculation sub-grid and its mapping onto leaf pairs
///
/// Only the leaf pairs that some grid row actually maps onto are needed, so
/// `leaves` is the contiguous range of leaf pair indices to slice out of the
/// MLC positions, and `leaf_map[j]` is the index of the leaf pair for row `j`
/// relative to the start of that range.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcGrid {
    /// Grid cell centres covering the delivery
    pub grid: Grid,
    /// Leaf pair for each grid row, relative to `leaves.start()`
    pub leaf_map: Vec<usize>,
    /// Leaf pairs touched by the grid rows
    pub leaves: RangeInclusive<usize>,
}

/// Make sure the resolution is usable at all
pub(crate) fn check_resolution(resolution: f64) -> Result<()> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(Error::InvalidGridResolution(resolution));
    }
    Ok(())
}

/// Evenly spaced values from `start` to `stop` inclusive
///
/// Always produces at least the `start` value, even if `stop` is below it.
fn steps(start: f64, stop: f64, resolution: f64) -> Array1<f64> {
    let intervals = ((stop - start) / resolution).round().max(0.0) as usize;
    Array1::from_shape_fn(intervals + 1, |i| start + i as f64 * resolution)
}

/// The fixed output grid for a machine
///
/// The x extent covers the maximum leaf gap, and the rows cover the full
/// leaf bank. One row is always exactly on the centre of the middle leaf
/// pair, and the rest are placed on `resolution` steps either side of it
/// without going past the edges of the bank.
///
/// ```rust
/// # use mutools_delivery::Machine;
/// # use mutools_mudensity::full_grid;
/// let machine = Machine::new(vec![5.0, 5.0], 20.0).unwrap();
/// let grid = full_grid(&machine, 1.0).unwrap();
///
/// assert_eq!(grid.x.len(), 21);
/// assert_eq!(grid.x[0], -10.0);
/// assert_eq!(grid.y.to_vec(), vec![-4.5, -3.5, -2.5, -1.5, -0.5, 0.5, 1.5, 2.5, 3.5, 4.5]);
/// ```
///
/// The resolution has to divide half the maximum leaf gap exactly, otherwise
/// x coordinates of the calculation grid would never line up with these.
pub fn full_grid(machine: &Machine, resolution: f64) -> Result<Grid> {
    check_resolution(resolution)?;

    let half_gap = machine.max_leaf_gap() / 2.0;
    let divisions = half_gap / resolution;
    if (divisions - divisions.round()).abs() > 1e-9 {
        return Err(Error::IndivisibleMaxLeafGap {
            resolution,
            max_leaf_gap: machine.max_leaf_gap(),
        });
    }

    let reference = machine.reference_leaf_centre();
    let half_bank = machine.total_leaf_width() / 2.0;

    let top = ((half_bank - reference) / resolution).floor() * resolution + reference;
    let bottom = reference - ((half_bank + reference) / resolution).floor() * resolution;

    Ok(Grid {
        x: steps(-half_gap, half_gap, resolution),
        y: steps(bottom, top, resolution),
    })
}

/// The calculation sub-grid for a delivery
///
/// The x bounds are the furthest the left and right leaves ever reach,
/// pushed outwards onto multiples of the resolution. The y bounds are the
/// furthest the jaws ever open, with rows anchored on the middle leaf pair
/// the same way as [full_grid].
///
/// Each row is assigned the leaf pair with the closest centre, ties going to
/// the lower leaf pair, and only the touched leaf pairs are kept.
pub fn calc_grid(delivery: &Delivery, machine: &Machine, resolution: f64) -> Result<CalcGrid> {
    check_resolution(resolution)?;

    let mlc = delivery.mlc();
    let jaw = delivery.jaw();

    // furthest travel of each bank, left leaves are stored as positive-left
    let left = mlc.index_axis(Axis(2), 0).iter().map(|v| -v).collect::<Vec<f64>>();
    let right = mlc.index_axis(Axis(2), 1).iter().copied().collect::<Vec<f64>>();
    let min_x = (left.try_min()? / resolution).floor() * resolution;
    let max_x = (right.try_max()? / resolution).ceil() * resolution;

    // furthest opening of each jaw
    let bottom = jaw.column(0).iter().map(|v| -v).collect::<Vec<f64>>();
    let top = jaw.column(1).to_vec();
    let min_y = bottom.try_min()?;
    let max_y = top.try_max()?;

    let reference = machine.reference_leaf_centre();
    let top_row = ((max_y - reference) / resolution).floor() * resolution + reference;
    let bottom_row = reference - ((reference - min_y) / resolution).floor() * resolution;

    // a closed or nearly closed jaw still needs one row to exist
    let y = if top_row < bottom_row {
        debug!("Jaw opening is narrower than one grid row, using the reference row only");
        Array1::from_elem(1, reference)
    } else {
        steps(bottom_row, top_row, resolution)
    };

    let x = steps(min_x, max_x, resolution);

    let (leaf_map, leaves) = map_rows_to_leaves(&y, machine)?;

    debug!(
        "Calculation grid {}x{} over leaf pairs {}..={}",
        y.len(),
        x.len(),
        leaves.start(),
        leaves.end()
    );

    Ok(CalcGrid {
        grid: Grid { x, y },
        leaf_map,
        leaves,
    })
}

/// Assign every grid row to the leaf pair with the closest centre
fn map_rows_to_leaves(
    y: &Array1<f64>,
    machine: &Machine,
) -> Result<(Vec<usize>, RangeInclusive<usize>)> {
    let centres = machine.leaf_centres();

    let absolute = y
        .iter()
        .map(|row| centres.find_nearest(*row))
        .collect::<std::result::Result<Vec<usize>, _>>()?;

    // rows are sorted, so the map is too
    let first = absolute.first().copied().unwrap_or(0);
    let last = absolute.last().copied().unwrap_or(first);

    let relative = absolute.iter().map(|k| k - first).collect();
    Ok((relative, first..=last))
}

/// Paste values on a calculation grid into the matching cells of another
///
/// Coordinates are matched within [GRID_TOLERANCE]. Anything in the target
/// grid that is not covered stays zero, and anything in the source grid that
/// falls outside the target is dropped.
pub fn place_on_grid(source: &Grid, values: ArrayView2<f64>, target: &Grid) -> Array2<f64> {
    let mut placed = Array2::zeros(target.shape());

    let target_x = target.x.to_vec();
    let target_y = target.y.to_vec();

    let columns: Vec<(usize, usize)> = source
        .x
        .iter()
        .enumerate()
        .filter_map(|(from, x)| target_x.find_within(*x, GRID_TOLERANCE).map(|to| (from, to)))
        .collect();

    let rows: Vec<(usize, usize)> = source
        .y
        .iter()
        .enumerate()
        .filter_map(|(from, y)| target_y.find_within(*y, GRID_TOLERANCE).map(|to| (from, to)))
        .collect();

    let dropped = source.x.len() * source.y.len() - columns.len() * rows.len();
    if dropped > 0 {
        let kept: f64 = rows
            .iter()
            .map(|(row, _)| columns.iter().map(|(col, _)| values[[*row, *col]]).sum::<f64>())
            .sum();
        let lost = values.sum() - kept;
        if lost > 0.0 {
            warn!("{dropped} calculation cells fall outside the output grid, dropping {lost:.3e} MU");
        }
    }

    for (from_row, to_row) in &rows {
        let source_row = values.slice(s![*from_row, ..]);
        let mut target_row = placed.row_mut(*to_row);
        for (from_col, to_col) in &columns {
            target_row[*to_col] = source_row[*from_col];
        }
    }

    placed
}
