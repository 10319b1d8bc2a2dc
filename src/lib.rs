//! `mutools` is a semi-modular toolkit of fast and reliable libraries for
//! radiotherapy delivery quality assurance
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Re-exports of toolkit crates.
#[doc(inline)]
pub use mutools_utils as utils;

#[cfg(feature = "delivery")]
#[cfg_attr(docsrs, doc(cfg(feature = "delivery")))]
#[doc(inline)]
pub use mutools_delivery as delivery;

#[cfg(feature = "mudensity")]
#[cfg_attr(docsrs, doc(cfg(feature = "mudensity")))]
#[doc(inline)]
pub use mutools_mudensity as mudensity;
