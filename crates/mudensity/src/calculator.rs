//! Configure and run MU density calculations

// crate modules
use crate::density::MuDensity;
use crate::error::{Error, Result};
use crate::grid::{calc_grid, check_resolution, full_grid, place_on_grid};
use crate::memory::{FixedBatch, MemoryProbe, SystemMemory};
use crate::sweep::{BatchSizer, Sweep};

// mutools modules
use mutools_delivery::{Delivery, Machine, DEFAULT_MAX_LEAF_GAP};

// external crates
use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2, ArrayView3};

/// Default grid spacing (mm)
pub const DEFAULT_GRID_RESOLUTION: f64 = 1.0;

/// Default fraction of available memory a batch may use
pub const DEFAULT_RAM_FRACTION: f64 = 0.8;

/// Default smallest number of transitions per batch
pub const DEFAULT_MIN_BATCH_SIZE: usize = 20;

/// Calculator for the MU density of deliveries on a single machine
///
/// Every delivery is first checked against the machine, has its irrelevant
/// control points removed, and is integrated over a calculation grid that
/// only covers what the delivery opens. The result is then placed on the
/// fixed grid of the machine, so every result from the same calculator can
/// be combined directly.
///
/// Transitions are processed in batches. The first batch has the minimum
/// size, and later batches are scaled so their predicted memory use stays
/// within the RAM fraction of what is available. Batching never changes the
/// result beyond floating point round-off.
///
/// Minimal Example:
/// ```rust
/// # use mutools_delivery::{Delivery, Machine};
/// # use mutools_mudensity::MuDensityCalculator;
/// let machine = Machine::new(vec![5.0, 5.0], 20.0).unwrap();
///
/// // 10 MU through a fixed 4x10 mm opening
/// let delivery = Delivery::from_vecs(
///     vec![0.0, 10.0],
///     vec![vec![[2.0, 2.0]; 2]; 2],
///     vec![[5.0, 5.0]; 2],
/// ).unwrap();
///
/// let mut calculator = MuDensityCalculator::new(machine);
/// let mu_density = calculator.calculate(&delivery).unwrap();
///
/// assert_eq!(mu_density.grid.shape(), (10, 21));
/// assert_eq!(mu_density.max(), 10.0);
/// ```
#[derive(Debug)]
pub struct MuDensityCalculator {
    /// Geometry of the treatment head
    machine: Machine,
    /// Spacing of the grid in both directions (mm)
    grid_resolution: f64,
    /// Fraction of available memory a batch may use
    ram_fraction: f64,
    /// Smallest number of transitions per batch
    min_batch_size: usize,
    /// Source of memory readings for batch sizing
    probe: Box<dyn MemoryProbe>,
    /// Disable progress bar?
    disable_progress: bool,
}

impl Default for MuDensityCalculator {
    fn default() -> Self {
        Self::new(Machine::default())
    }
}

// ! ------------------------------------------------------------------------
// !                                Public API
// ! ------------------------------------------------------------------------

impl MuDensityCalculator {
    /// Calculator with default settings for the given machine
    pub fn new(machine: Machine) -> Self {
        Self {
            machine,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            ram_fraction: DEFAULT_RAM_FRACTION,
            min_batch_size: DEFAULT_MIN_BATCH_SIZE,
            probe: Box::new(SystemMemory::new()),
            disable_progress: true,
        }
    }

    /// MU density of a delivery on the fixed grid of the machine
    pub fn calculate(&mut self, delivery: &Delivery) -> Result<MuDensity> {
        self.check_settings()?;
        self.machine.check_delivery(delivery)?;

        let fixed = full_grid(&self.machine, self.grid_resolution)?;

        let delivery = delivery.remove_irrelevant_control_points();
        let calc = calc_grid(&delivery, &self.machine, self.grid_resolution)?;

        let sizer = BatchSizer::new(self.min_batch_size, self.ram_fraction);
        let density = Sweep::new(sizer, self.probe.as_mut(), self.disable_progress)
            .integrate(&delivery, &calc)?;

        debug!(
            "Placing {}x{} calculation grid onto the {}x{} fixed grid",
            calc.grid.y.len(),
            calc.grid.x.len(),
            fixed.y.len(),
            fixed.x.len()
        );
        let density = place_on_grid(&calc.grid, density.view(), &fixed);

        MuDensity::new(fixed, density)
    }

    /// The machine deliveries are calculated for
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Setter for the grid spacing (mm)
    ///
    /// Must divide half the maximum leaf gap of the machine exactly.
    pub fn set_grid_resolution(&mut self, grid_resolution: f64) {
        self.grid_resolution = grid_resolution;
    }

    /// Setter for the fraction of available memory a batch may use
    pub fn set_ram_fraction(&mut self, ram_fraction: f64) {
        self.ram_fraction = ram_fraction;
    }

    /// Setter for the smallest number of transitions per batch
    pub fn set_min_batch_size(&mut self, min_batch_size: usize) {
        self.min_batch_size = min_batch_size;
    }

    /// Replace the source of memory readings
    ///
    /// Use [FixedBatch] to always process the minimum batch size.
    pub fn set_memory_probe<P: MemoryProbe + 'static>(&mut self, probe: P) {
        self.probe = Box::new(probe);
    }

    /// Print a tqdm progress bar over the transitions
    pub fn enable_progress(&mut self) {
        self.disable_progress = false;
    }

    /// Do not print the tqdm progress indicators
    pub fn disable_progress(&mut self) {
        self.disable_progress = true;
    }
}

impl MuDensityCalculator {
    fn check_settings(&self) -> Result<()> {
        check_resolution(self.grid_resolution)?;

        if self.ram_fraction.is_nan() || self.ram_fraction <= 0.0 || self.ram_fraction > 1.0 {
            return Err(Error::InvalidRamFraction(self.ram_fraction));
        }

        if self.min_batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }

        Ok(())
    }
}

// ! ------------------------------------------------------------------------
// !                            Convenience functions
// ! ------------------------------------------------------------------------

/// MU density from raw control point arrays
///
/// - `mu` cumulative monitor units, length `N`
/// - `mlc` stored leaf positions, shape `[N, leaf pairs, 2]`
/// - `jaw` stored jaw positions, shape `[N, 2]`
///
/// ```rust
/// # use mutools_mudensity::calc_mu_density;
/// # use ndarray::array;
/// let mu = array![0.0, 100.0];
/// let mlc = array![[[5.0, 5.0], [5.0, 5.0]], [[5.0, 5.0], [5.0, 5.0]]];
/// let jaw = array![[5.0, 5.0], [5.0, 5.0]];
///
/// let mu_density =
///     calc_mu_density(mu.view(), mlc.view(), jaw.view(), 1.0, 20.0, &[5.0, 5.0], 0.8).unwrap();
///
/// // cells on the leaf tips count as blocked
/// assert_eq!(mu_density.total(), 100.0 * 9.0 * 10.0);
/// ```
pub fn calc_mu_density(
    mu: ArrayView1<f64>,
    mlc: ArrayView3<f64>,
    jaw: ArrayView2<f64>,
    grid_resolution: f64,
    max_leaf_gap: f64,
    leaf_pair_widths: &[f64],
    ram_fraction: f64,
) -> Result<MuDensity> {
    let delivery = Delivery::new(mu.to_owned(), mlc.to_owned(), jaw.to_owned())?;
    let machine = Machine::new(leaf_pair_widths.to_vec(), max_leaf_gap)?;

    let mut calculator = MuDensityCalculator::new(machine);
    calculator.set_grid_resolution(grid_resolution);
    calculator.set_ram_fraction(ram_fraction);
    calculator.calculate(&delivery)
}

/// MU density on the default machine with default settings
pub fn calc_mu_density_default(delivery: &Delivery) -> Result<MuDensity> {
    MuDensityCalculator::default().calculate(delivery)
}

/// 1 MU density across a row for a single leaf pair
///
/// `left` and `right` are the signed x coordinates of the leaf tips as
/// `(start, end)`. The jaws sit half a grid step either side of the row, so
/// only the leaves block anything. Returns the x coordinates of the cells
/// covering the leaf travel and the density at each.
///
/// ```rust
/// # use mutools_mudensity::single_mlc_pair;
/// let (x, mu_density) = single_mlc_pair((-2.3, 3.1), (0.0, 7.7), 1.0).unwrap();
///
/// assert_eq!(x[0], -3.0);
/// assert_eq!(x[x.len() - 1], 8.0);
/// assert_eq!(mu_density[0], 0.0);
/// assert!((mu_density[6] - 0.592).abs() < 1e-3);
/// ```
pub fn single_mlc_pair(
    left: (f64, f64),
    right: (f64, f64),
    grid_resolution: f64,
) -> Result<(Array1<f64>, Array1<f64>)> {
    check_resolution(grid_resolution)?;

    let half_step = grid_resolution / 2.0;
    let delivery = Delivery::from_vecs(
        vec![0.0, 1.0],
        vec![vec![[-left.0, right.0]], vec![[-left.1, right.1]]],
        vec![[half_step, half_step]; 2],
    )?;
    let machine = Machine::new(vec![grid_resolution], DEFAULT_MAX_LEAF_GAP)?;

    let calc = calc_grid(&delivery, &machine, grid_resolution)?;

    let mut probe = FixedBatch;
    let sizer = BatchSizer::new(1, DEFAULT_RAM_FRACTION);
    let density = Sweep::new(sizer, &mut probe, true).integrate(&delivery, &calc)?;

    Ok((calc.grid.x, density.row(0).to_owned()))
}
