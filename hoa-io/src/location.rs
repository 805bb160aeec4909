//! Storage locations of dataset arrays.
//!
//! Arrays live in Google Cloud Storage as N5 or OME-Zarr groups, with one
//! array per downsample level. Only the URL is interpreted here; no remote
//! requests are made.

use std::fmt;

use hoa_core::Dataset;

use crate::error::{Error, Result};

/// On-disk array format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageFormat {
    N5,
    Zarr,
}

impl StorageFormat {
    fn scheme(self) -> &'static str {
        match self {
            Self::N5 => "n5",
            Self::Zarr => "zarr",
        }
    }
}

/// Parsed storage URL, e.g. `n5://gs://bucket/S-20-29/heart/2.5um_VOI-01_bm05/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLocation {
    pub format: StorageFormat,
    pub bucket: String,
    /// Group path within the bucket, without surrounding slashes.
    pub path: String,
}

impl StorageLocation {
    /// Parses a storage URL.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUrl`] unless the URL starts with
    /// `n5://gs://` or `zarr://gs://` and names a bucket.
    pub fn parse(url: &str) -> Result<Self> {
        let unsupported = || Error::UnsupportedUrl(url.to_owned());
        let (format, rest) = if let Some(rest) = url.strip_prefix("n5://") {
            (StorageFormat::N5, rest)
        } else if let Some(rest) = url.strip_prefix("zarr://") {
            (StorageFormat::Zarr, rest)
        } else {
            return Err(unsupported());
        };

        let rest = rest.strip_prefix("gs://").ok_or_else(unsupported)?;
        let (bucket, path) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(unsupported());
        }
        Ok(Self {
            format,
            bucket: bucket.to_owned(),
            path: path.trim_matches('/').to_owned(),
        })
    }

    /// Storage location of a dataset.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedUrl`] if the dataset URL cannot be parsed.
    pub fn of(dataset: &Dataset) -> Result<Self> {
        Self::parse(&dataset.data.gcs_url)
    }

    /// Key of the array holding `level` within the group.
    #[must_use]
    pub fn level_key(&self, level: u32) -> String {
        match self.format {
            StorageFormat::N5 => format!("s{level}"),
            StorageFormat::Zarr => level.to_string(),
        }
    }

    /// Path of the array holding `level` within the bucket.
    #[must_use]
    pub fn array_path(&self, level: u32) -> String {
        if self.path.is_empty() {
            self.level_key(level)
        } else {
            format!("{}/{}", self.path, self.level_key(level))
        }
    }

    /// Whether arrays are stored `(x, y, z)` and must be transposed.
    #[must_use]
    pub fn is_transposed(&self) -> bool {
        self.format == StorageFormat::Zarr
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://gs://{}/{}", self.format.scheme(), self.bucket, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEART: &str = "n5://gs://ucl-hip-ct-35a68e99feaae8932b1d44da0358940b/S-20-29/heart/2.5um_VOI-01_bm05/";

    #[test]
    fn test_parse_n5() {
        let loc = StorageLocation::parse(HEART).unwrap();
        assert_eq!(loc.format, StorageFormat::N5);
        assert_eq!(loc.bucket, "ucl-hip-ct-35a68e99feaae8932b1d44da0358940b");
        assert_eq!(loc.path, "S-20-29/heart/2.5um_VOI-01_bm05");
        assert_eq!(loc.level_key(3), "s3");
        assert_eq!(loc.array_path(0), "S-20-29/heart/2.5um_VOI-01_bm05/s0");
        assert!(!loc.is_transposed());
    }

    #[test]
    fn test_parse_zarr() {
        let loc = StorageLocation::parse("zarr://gs://bucket/a/b").unwrap();
        assert_eq!(loc.format, StorageFormat::Zarr);
        assert_eq!(loc.level_key(2), "2");
        assert!(loc.is_transposed());
        assert_eq!(loc.to_string(), "zarr://gs://bucket/a/b");
    }

    #[test]
    fn test_bucket_only() {
        let loc = StorageLocation::parse("n5://gs://bucket").unwrap();
        assert_eq!(loc.path, "");
        assert_eq!(loc.array_path(1), "s1");
    }

    #[test]
    fn test_unsupported() {
        for url in ["s3://bucket/x", "n5://bucket/x", "zarr://gs:///x", ""] {
            assert!(
                matches!(StorageLocation::parse(url), Err(Error::UnsupportedUrl(_))),
                "{url} should be rejected"
            );
        }
    }
}
