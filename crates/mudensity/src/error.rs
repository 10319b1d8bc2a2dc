//! Result and Error types for mutools-mudensity

/// Type alias for Result<T, mudensity::Error>
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `mutools-mudensity` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed input/output stream")]
    IOError(#[from] std::io::Error),

    #[error("failed to write csv")]
    CsvError(#[from] csv::Error),

    #[error("invalid delivery or machine")]
    DeliveryError(#[from] mutools_delivery::Error),

    #[error("invalid float data")]
    UtilsError(#[from] mutools_utils::Error),

    #[error("grid resolution must be positive and finite (found {0})")]
    InvalidGridResolution(f64),

    #[error("grid resolution {resolution} does not exactly divide half the max leaf gap {max_leaf_gap}")]
    IndivisibleMaxLeafGap { resolution: f64, max_leaf_gap: f64 },

    #[error("ram fraction must be within (0, 1] (found {0})")]
    InvalidRamFraction(f64),

    #[error("minimum batch size must be at least 1 transition")]
    InvalidBatchSize,

    #[error("blocked fraction is undefined, this is a bug")]
    UndefinedBlockedFraction,

    #[error("cannot broadcast {from:?} onto {to:?}")]
    FailedBroadcast { from: Vec<usize>, to: Vec<usize> },

    #[error("mu densities are on different grids")]
    MismatchedGrids,

    #[error("comparison normalisation must be non-zero (found {0})")]
    InvalidNormalisation(f64),

    #[error("failed to initialise progress bar: {0}")]
    ProgressBar(String),
}
