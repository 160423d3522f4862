use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("scan cancelled")]
    Cancelled,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The index rejected the batch write. Structural, not per-asset.
    #[error(transparent)]
    Index(#[from] video_index::IndexError),

    #[error("scan worker failed: {0}")]
    Worker(String),
}
