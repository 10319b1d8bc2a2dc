//! Module for the treatment head geometry

// standard library
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// crate modules
use crate::delivery::Delivery;
use crate::error::{Error, Result};

// mutools modules
use mutools_utils::SliceExt;

// external crates
use log::debug;
use serde::{Deserialize, Serialize};

/// Leaf pair widths (mm) of an Agility-style head, 80 pairs of 5 mm
pub const AGILITY_LEAF_PAIR_WIDTHS: [f64; 80] = [5.0; 80];

/// Default maximum distance (mm) between opposing leaves
pub const DEFAULT_MAX_LEAF_GAP: f64 = 400.0;

/// Collimator geometry of a treatment head at the isocentre
///
/// The leaf pair widths define the vertical layout of the MLC. Pairs are
/// listed from the bottom of the bank (most negative y) to the top, and the
/// whole bank is centred on the central axis. Widths do not need to be
/// uniform.
///
/// The maximum leaf gap bounds the horizontal extent of the fixed output
/// grid, running from `-max_leaf_gap/2` to `+max_leaf_gap/2`.
///
/// Machines may be stored as JSON for reuse:
///
/// ```json
/// { "leaf_pair_widths": [10.0, 5.0, 5.0, 10.0], "max_leaf_gap": 400.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MachineDefinition")]
pub struct Machine {
    leaf_pair_widths: Vec<f64>,
    max_leaf_gap: f64,
}

/// Unchecked machine fields as they appear in JSON
#[derive(Deserialize)]
struct MachineDefinition {
    leaf_pair_widths: Vec<f64>,
    max_leaf_gap: f64,
}

impl TryFrom<MachineDefinition> for Machine {
    type Error = Error;

    fn try_from(definition: MachineDefinition) -> Result<Self> {
        Machine::new(definition.leaf_pair_widths, definition.max_leaf_gap)
    }
}

impl Machine {
    /// Create a machine from leaf pair widths and the maximum leaf gap
    ///
    /// ```rust
    /// # use mutools_delivery::Machine;
    /// let machine = Machine::new(vec![5.0, 5.0], 20.0).unwrap();
    /// assert_eq!(machine.number_of_leaf_pairs(), 2);
    ///
    /// // Widths must be positive, as must the gap
    /// assert!(Machine::new(vec![5.0, 0.0], 20.0).is_err());
    /// assert!(Machine::new(vec![5.0, 5.0], -1.0).is_err());
    /// ```
    pub fn new(leaf_pair_widths: Vec<f64>, max_leaf_gap: f64) -> Result<Self> {
        let machine = Self {
            leaf_pair_widths,
            max_leaf_gap,
        };
        machine.check()?;
        Ok(machine)
    }

    /// Agility-style head, 80 leaf pairs of 5 mm and a 400 mm leaf gap
    pub fn agility() -> Self {
        Self {
            leaf_pair_widths: AGILITY_LEAF_PAIR_WIDTHS.to_vec(),
            max_leaf_gap: DEFAULT_MAX_LEAF_GAP,
        }
    }

    /// Millennium-style head, 60 leaf pairs with 10 mm outer and 5 mm inner
    pub fn millennium() -> Self {
        let mut leaf_pair_widths = vec![10.0; 10];
        leaf_pair_widths.extend([5.0; 40]);
        leaf_pair_widths.extend([10.0; 10]);

        Self {
            leaf_pair_widths,
            max_leaf_gap: DEFAULT_MAX_LEAF_GAP,
        }
    }

    /// Read a machine definition from a JSON file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let machine: Machine = serde_json::from_reader(reader)?;
        debug!(
            "Loaded machine with {} leaf pairs",
            machine.number_of_leaf_pairs()
        );
        Ok(machine)
    }

    /// Write the machine definition to a JSON file
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Width of every leaf pair, bottom to top
    pub fn leaf_pair_widths(&self) -> &[f64] {
        &self.leaf_pair_widths
    }

    /// Maximum distance between opposing leaves
    pub fn max_leaf_gap(&self) -> f64 {
        self.max_leaf_gap
    }

    /// Number of leaf pairs in the bank
    pub fn number_of_leaf_pairs(&self) -> usize {
        self.leaf_pair_widths.len()
    }

    /// Total extent of the leaf bank in y
    pub fn total_leaf_width(&self) -> f64 {
        self.leaf_pair_widths.iter().sum()
    }

    /// Signed y coordinate of the centre of every leaf pair
    ///
    /// The bank is centred on the central axis.
    ///
    /// ```rust
    /// # use mutools_delivery::Machine;
    /// let machine = Machine::new(vec![10.0, 5.0, 5.0, 10.0], 400.0).unwrap();
    /// assert_eq!(machine.leaf_centres(), vec![-10.0, -2.5, 2.5, 10.0]);
    /// ```
    pub fn leaf_centres(&self) -> Vec<f64> {
        let half_total = self.total_leaf_width() / 2.0;
        let mut top = 0.0;

        self.leaf_pair_widths
            .iter()
            .map(|width| {
                top += width;
                top - width / 2.0 - half_total
            })
            .collect()
    }

    /// Centre of the middle leaf pair, used to anchor the grid rows
    ///
    /// For an even number of pairs this is the pair just above the central
    /// axis.
    pub fn reference_leaf_centre(&self) -> f64 {
        let centres = self.leaf_centres();
        centres[centres.len() / 2]
    }

    /// Make sure a delivery can be delivered by this machine
    ///
    /// The number of leaf pairs must match, and no leaf may travel further
    /// from the central axis than half the maximum leaf gap.
    pub fn check_delivery(&self, delivery: &Delivery) -> Result<()> {
        let found = delivery.number_of_leaf_pairs();
        if found != self.number_of_leaf_pairs() {
            return Err(Error::LeafPairMismatch {
                expected: self.number_of_leaf_pairs(),
                found,
            });
        }

        let mlc = delivery.mlc();
        let positions = mlc.iter().map(|v| v.abs()).collect::<Vec<f64>>();
        let furthest = positions.try_max()?;
        let limit = self.max_leaf_gap / 2.0;

        if furthest > limit {
            return Err(Error::LeafBeyondMaxLeafGap {
                position: furthest,
                limit,
            });
        }

        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.leaf_pair_widths.is_empty() {
            return Err(Error::NoLeafPairs);
        }

        if let Some(width) = self
            .leaf_pair_widths
            .iter()
            .find(|w| !w.is_finite() || **w <= 0.0)
        {
            return Err(Error::InvalidLeafPairWidth(*width));
        }

        if !self.max_leaf_gap.is_finite() || self.max_leaf_gap <= 0.0 {
            return Err(Error::InvalidMaxLeafGap(self.max_leaf_gap));
        }

        Ok(())
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::agility()
    }
}

impl std::fmt::Display for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Machine {{ leaf pairs: {}, bank width: {} mm, max leaf gap: {} mm }}",
            self.number_of_leaf_pairs(),
            self.total_leaf_width(),
            self.max_leaf_gap
        )
    }
}
