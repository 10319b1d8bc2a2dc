//! Swept-aperture MU density of MLC deliveries
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod aperture;
mod calculator;
mod density;
mod error;
mod grid;
mod kernel;
mod memory;
mod sweep;

#[doc(inline)]
pub use calculator::{
    calc_mu_density, calc_mu_density_default, single_mlc_pair, MuDensityCalculator,
    DEFAULT_GRID_RESOLUTION, DEFAULT_MIN_BATCH_SIZE, DEFAULT_RAM_FRACTION,
};

#[doc(inline)]
pub use density::MuDensity;

#[doc(inline)]
pub use grid::{calc_grid, full_grid, place_on_grid, CalcGrid, Grid, GRID_TOLERANCE};

#[doc(inline)]
pub use kernel::{
    edge_blocked_fractions, leaf_pair_blocked_fraction, swept_blocked_fraction, BlockedFraction,
    BlockedFractions, Edge,
};

#[doc(inline)]
pub use aperture::{weighted_open_fraction, ApertureFractions};

#[doc(inline)]
pub use memory::{FixedBatch, MemoryProbe, SystemMemory};

#[doc(inline)]
pub use error::{Error, Result};
