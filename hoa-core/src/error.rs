//! Error types for hoa-core.

use crate::coordinate::Axis;
use thiserror::Error;

/// Result type alias for hoa-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for volume and registration operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A parameter is outside of its valid domain.
    #[error("invalid {parameter}: {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    /// No chain of registrations connects two datasets.
    #[error("no registration path between {source_dataset} and {target_dataset}")]
    NoRegistrationPath {
        source_dataset: String,
        target_dataset: String,
    },

    /// An index window reaches outside of the underlying array.
    #[error("{axis} window {start}..{end} is outside of array with length {len}")]
    OutOfBounds {
        axis: Axis,
        start: i64,
        end: i64,
        len: usize,
    },

    /// The array provider has no data for a dataset at a level.
    #[error("no array for dataset {dataset} at downsample level {level}")]
    MissingArray { dataset: String, level: u32 },

    /// An array did not have the expected shape.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

impl Error {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }
}
