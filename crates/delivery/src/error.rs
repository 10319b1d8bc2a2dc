//! Result and Error types for mutools-delivery

/// Type alias for Result<T, delivery::Error>
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `mutools-delivery` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed input/output stream")]
    IOError(#[from] std::io::Error),

    #[error("failed to (de)serialise")]
    FailedSerde(#[from] serde_json::Error),

    #[error("invalid float data")]
    UtilsError(#[from] mutools_utils::Error),

    #[error("at least 2 control points are required (found {found})")]
    TooFewControlPoints { found: usize },

    #[error("inconsistent number of control points (mu {mu}, mlc {mlc}, jaw {jaw})")]
    InconsistentControlPoints { mu: usize, mlc: usize, jaw: usize },

    #[error("mlc positions need exactly 2 banks per leaf pair (found {0})")]
    UnexpectedMlcShape(usize),

    #[error("jaw positions need exactly 2 diaphragms per control point (found {0})")]
    UnexpectedJawShape(usize),

    #[error("delivery contains no leaf pairs")]
    NoLeafPairs,

    #[error("inconsistent number of leaf pairs (expected {expected}, found {found})")]
    LeafPairMismatch { expected: usize, found: usize },

    #[error("{0} contains NAN or infinite values")]
    UndefinedPosition(&'static str),

    #[error("monitor units must not be negative (found {0})")]
    NegativeMonitorUnits(f64),

    #[error("monitor units decrease at control point {index} ({previous} -> {current})")]
    DecreasingMonitorUnits {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("control point {index} cannot split a delivery of {length} control points")]
    ControlPointOutOfRange { index: usize, length: usize },

    #[error("leaf pair widths must be positive and finite (found {0})")]
    InvalidLeafPairWidth(f64),

    #[error("maximum leaf gap must be positive and finite (found {0})")]
    InvalidMaxLeafGap(f64),

    #[error("mlc travels to {position} mm, beyond half the maximum leaf gap ({limit} mm)")]
    LeafBeyondMaxLeafGap { position: f64, limit: f64 },
}
