//! Beam delivery control points and machine geometry
#![doc = include_str!("../readme.md")]

// Split into subfiles for development, but anything important is re-exported
mod delivery;
mod error;
mod machine;

#[doc(inline)]
pub use delivery::{relevant_control_points, Delivery};

#[doc(inline)]
pub use machine::{Machine, AGILITY_LEAF_PAIR_WIDTHS, DEFAULT_MAX_LEAF_GAP};

#[doc(inline)]
pub use error::{Error, Result};
