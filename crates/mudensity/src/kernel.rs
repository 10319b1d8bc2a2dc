//! Blocked fraction of grid cells swept by a single collimator edge
//!
//! Between two control points every leaf and jaw is assumed to move linearly
//! in time while the MU is delivered at a constant rate. For a cell that the
//! edge passes over, the fraction of the transition spent blocked is then
//! the fraction of the travel spent on the blocking side of the cell centre.
//!
//! The fraction is split into the part attributed to the start of the
//! transition (the cell was blocked at first and opens up) and the part
//! attributed to the end (the cell was open and gets covered). Keeping both
//! lets several edges be combined per cell by taking the maximum of each.

// crate modules
use crate::error::{Error, Result};

// external crates
use ndarray::{Array1, Array3, ArrayView1, ArrayView2, Axis, Zip};

/// A collimator edge and its sign convention
///
/// Positions are stored as positive distances from the central axis towards
/// the side the leaf or jaw belongs to. The left leaves and the bottom jaw
/// therefore sit at the negative of their stored value and block everything
/// below that coordinate. The right leaves and the top jaw block everything
/// above their stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// Left (A-bank) leaf, blocks `x <= -position`
    Left,
    /// Right (B-bank) leaf, blocks `x >= position`
    Right,
    /// Bottom jaw, blocks `y <= -position`
    Bottom,
    /// Top jaw, blocks `y >= position`
    Top,
}

impl Edge {
    /// Signed coordinate of the edge for a stored position
    ///
    /// ```rust
    /// # use mutools_mudensity::Edge;
    /// assert_eq!(Edge::Left.coordinate(30.0), -30.0);
    /// assert_eq!(Edge::Top.coordinate(30.0), 30.0);
    /// ```
    pub fn coordinate(self, position: f64) -> f64 {
        match self {
            Edge::Left | Edge::Bottom => -position,
            Edge::Right | Edge::Top => position,
        }
    }

    /// Is a cell blocked given its offset from the edge coordinate
    ///
    /// A cell centre exactly on the edge counts as blocked.
    pub fn blocks(self, offset: f64) -> bool {
        match self {
            Edge::Left | Edge::Bottom => offset <= 0.0,
            Edge::Right | Edge::Top => offset >= 0.0,
        }
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            Edge::Left => "left leaf",
            Edge::Right => "right leaf",
            Edge::Bottom => "bottom jaw",
            Edge::Top => "top jaw",
        };
        write!(f, "{name}")
    }
}

/// Start and end parts of the fraction of a transition a cell is blocked
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct BlockedFraction {
    /// Blocked from the start of the transition until the edge passes
    pub start: f64,
    /// Blocked from when the edge passes until the end of the transition
    pub end: f64,
}

impl BlockedFraction {
    /// Combined blocked fraction, never more than 1
    pub fn total(&self) -> f64 {
        (self.start + self.end).min(1.0)
    }
}

/// Blocked fraction of one cell for one edge moving from `start` to `end`
///
/// `start` and `end` are stored positions, see [Edge] for the conventions.
///
/// ```rust
/// # use mutools_mudensity::{swept_blocked_fraction, Edge};
/// // Right leaf retracting from x=0 to x=10 past a cell at x=2
/// let fraction = swept_blocked_fraction(Edge::Right, 2.0, 0.0, 10.0);
/// assert_eq!(fraction.start, 0.2);
/// assert_eq!(fraction.end, 0.0);
///
/// // Never reached by the leaf
/// let fraction = swept_blocked_fraction(Edge::Right, -2.0, 0.0, 10.0);
/// assert_eq!(fraction.total(), 0.0);
/// ```
pub fn swept_blocked_fraction(edge: Edge, coordinate: f64, start: f64, end: f64) -> BlockedFraction {
    let start_offset = coordinate - edge.coordinate(start);
    let end_offset = coordinate - edge.coordinate(end);

    match (edge.blocks(start_offset), edge.blocks(end_offset)) {
        (false, false) => BlockedFraction::default(),
        (true, true) => BlockedFraction {
            start: 1.0,
            end: 1.0,
        },
        // the blocked state changed, so the offsets differ and travel > 0
        (true, false) => BlockedFraction {
            start: start_offset.abs() / (start_offset - end_offset).abs(),
            end: 0.0,
        },
        (false, true) => BlockedFraction {
            start: 0.0,
            end: end_offset.abs() / (start_offset - end_offset).abs(),
        },
    }
}

/// Start and end blocked fractions for a batch of transitions
///
/// Both arrays are indexed `[transition, device, cell]`, where a device is a
/// leaf pair for the MLC or a single entry for a jaw.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockedFractions {
    /// Start parts of the blocked fractions
    pub start: Array3<f64>,
    /// End parts of the blocked fractions
    pub end: Array3<f64>,
}

/// Blocked fractions of every cell for every transition of one edge type
///
/// `positions` holds the stored positions indexed `[control point, device]`,
/// and `coordinates` the cell centres along the direction the edge travels.
/// Consecutive control points form the transitions, so `N` control points
/// give `N - 1` transitions.
pub fn edge_blocked_fractions(
    edge: Edge,
    coordinates: ArrayView1<f64>,
    positions: ArrayView2<f64>,
) -> Result<BlockedFractions> {
    let (n_control_points, n_devices) = positions.dim();
    let shape = (n_control_points.saturating_sub(1), n_devices, coordinates.len());

    let mut start = Array3::zeros(shape);
    let mut end = Array3::zeros(shape);

    Zip::indexed(&mut start)
        .and(&mut end)
        .for_each(|(t, k, c), s, e| {
            let fraction = swept_blocked_fraction(
                edge,
                coordinates[c],
                positions[[t, k]],
                positions[[t + 1, k]],
            );
            *s = fraction.start;
            *e = fraction.end;
        });

    if start.iter().chain(end.iter()).any(|v| v.is_nan()) {
        return Err(Error::UndefinedBlockedFraction);
    }

    Ok(BlockedFractions { start, end })
}

/// Blocked fraction across a row for a single leaf pair transition
///
/// Unlike the stored positions used everywhere else, `left` and `right` are
/// the signed x coordinates of the leaf tips as `(start, end)`. Useful for
/// inspecting how a single pair of leaves sweeps across a row.
///
/// ```rust
/// # use mutools_mudensity::leaf_pair_blocked_fraction;
/// # use ndarray::array;
/// let x = array![-2.0, 0.0, 2.0, 4.0];
/// let blocked = leaf_pair_blocked_fraction(x.view(), (-1.0, -1.0), (3.0, 3.0)).unwrap();
/// assert_eq!(blocked.to_vec(), vec![1.0, 0.0, 0.0, 1.0]);
/// ```
pub fn leaf_pair_blocked_fraction(
    x: ArrayView1<f64>,
    left: (f64, f64),
    right: (f64, f64),
) -> Result<Array1<f64>> {
    let left_positions = ndarray::array![[-left.0], [-left.1]];
    let right_positions = ndarray::array![[right.0], [right.1]];

    let left = edge_blocked_fractions(Edge::Left, x, left_positions.view())?;
    let right = edge_blocked_fractions(Edge::Right, x, right_positions.view())?;

    let start = Zip::from(&left.start)
        .and(&right.start)
        .map_collect(|a, b| a.max(*b));
    let end = Zip::from(&left.end)
        .and(&right.end)
        .map_collect(|a, b| a.max(*b));

    let blocked = Zip::from(&start)
        .and(&end)
        .map_collect(|s, e| (s + e).min(1.0));

    Ok(blocked.index_axis(Axis(0), 0).index_axis(Axis(0), 0).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn stationary_edge_is_binary() {
        for x in [-3.0, -1.0, 0.0, 1.0, 3.0] {
            let fraction = swept_blocked_fraction(Edge::Left, x, 1.0, 1.0);
            let expected = if x <= -1.0 { 1.0 } else { 0.0 };
            assert_eq!(fraction.total(), expected);
        }
    }

    #[test]
    fn closing_left_leaf() {
        // left leaf tip moving from x=-5 to x=5
        let fraction = swept_blocked_fraction(Edge::Left, 0.0, 5.0, -5.0);
        assert_eq!(fraction, BlockedFraction { start: 0.0, end: 0.5 });

        let fraction = swept_blocked_fraction(Edge::Left, 4.0, 5.0, -5.0);
        assert!((fraction.end - 0.1).abs() < 1e-12);
    }

    #[test]
    fn opening_jaws() {
        // bottom jaw retracting from y=2 to y=-8
        let fraction = swept_blocked_fraction(Edge::Bottom, 0.0, -2.0, 8.0);
        assert!((fraction.start - 0.2).abs() < 1e-12);
        assert_eq!(fraction.end, 0.0);

        // top jaw closing from y=8 to y=-2
        let fraction = swept_blocked_fraction(Edge::Top, 0.0, 8.0, -2.0);
        assert!((fraction.end - 0.2).abs() < 1e-12);
        assert_eq!(fraction.start, 0.0);
    }

    #[test]
    fn both_blocked_is_capped() {
        let fraction = swept_blocked_fraction(Edge::Top, 10.0, 2.0, 3.0);
        assert_eq!(fraction, BlockedFraction { start: 1.0, end: 1.0 });
        assert_eq!(fraction.total(), 1.0);
    }

    #[test]
    fn batch_shape() {
        let x = array![-1.0, 0.0, 1.0, 2.0];
        let positions = array![[1.0, 0.0], [0.0, 0.0], [-1.0, 2.0]];

        let fractions = edge_blocked_fractions(Edge::Right, x.view(), positions.view()).unwrap();
        assert_eq!(fractions.start.dim(), (2, 2, 4));
        assert_eq!(fractions.end.dim(), (2, 2, 4));

        // second leaf pair in the second transition retracts from 0 to 2
        assert_eq!(fractions.start[[1, 1, 1]], 0.0);
        assert_eq!(fractions.start[[1, 1, 2]], 0.5);
        assert_eq!(fractions.start[[1, 1, 3]], 1.0);
        assert_eq!(fractions.end[[1, 1, 3]], 1.0);
    }

    #[test]
    fn single_control_point_has_no_transitions() {
        let x = array![0.0, 1.0];
        let positions = array![[1.0]];
        let fractions = edge_blocked_fractions(Edge::Left, x.view(), positions.view()).unwrap();
        assert_eq!(fractions.start.dim(), (0, 1, 2));
    }

    #[test]
    fn edge_names() {
        assert_eq!(Edge::Bottom.to_string(), "bottom jaw");
    }
}
