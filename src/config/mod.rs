use crate::error::{Result, TransformError};
use std::env;
use std::path::PathBuf;

/// Runtime configuration for one function deployment
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Bucket the raw SQLite files are read from
    pub raw_bucket: String,

    /// Bucket the converted CSVs are written to
    pub processed_bucket: String,

    /// Local scratch root (default: /tmp)
    pub scratch_dir: PathBuf,

    /// Keep converted CSVs in scratch storage after upload (default: false)
    pub keep_converted: bool,
}

impl TransformConfig {
    /// Load configuration from environment variables.
    ///
    /// The two bucket names are mandatory; a missing one fails here at cold
    /// start rather than at the first storage call.
    pub fn from_env() -> Result<Self> {
        let raw_bucket = env::var("RAW_BUCKET_NAME")
            .map_err(|_| TransformError::Config("RAW_BUCKET_NAME must be set".into()))?;
        let processed_bucket = env::var("PROCESSED_BUCKET_NAME")
            .map_err(|_| TransformError::Config("PROCESSED_BUCKET_NAME must be set".into()))?;

        Ok(Self {
            raw_bucket,
            processed_bucket,
            scratch_dir: env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp")),
            keep_converted: env::var("KEEP_CONVERTED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(false),
        })
    }
}
