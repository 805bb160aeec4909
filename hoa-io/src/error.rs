//! I/O error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed metadata file.
    #[error("invalid metadata in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Inventory table error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] hoa_core::Error),

    /// Metadata directory without any metadata files.
    #[error("did not find any dataset metadata files at {}", .0.display())]
    EmptyMetadataDir(PathBuf),

    /// No dataset with this name is loaded.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    /// Registration hint naming a dataset that is not loaded.
    #[error("registration {source_dataset} -> {target_dataset} refers to a dataset that is not loaded")]
    UnresolvedReference {
        source_dataset: String,
        target_dataset: String,
    },

    /// Storage URL in an unknown format.
    #[error("URL must start with n5://gs:// or zarr://gs://, got {0}")]
    UnsupportedUrl(String),

    /// Two metadata files define the same dataset.
    #[error("dataset {0} is defined more than once")]
    DuplicateDataset(String),
}
