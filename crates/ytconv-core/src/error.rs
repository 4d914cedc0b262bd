use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while driving the external extractor process.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The binary could not be started at all (missing, not executable, ...).
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("{message}")]
    Failed { status: Option<i32>, message: String },

    /// The process exceeded the configured time budget and was killed.
    #[error("extractor timed out after {0:?}")]
    Timeout(Duration),

    /// Metadata output was not the JSON document we expected.
    #[error("unexpected extractor output: {0}")]
    Parse(#[from] serde_json::Error),

    /// The process reported success but the output file is not there.
    #[error("extractor finished without producing {0}")]
    MissingOutput(PathBuf),
}

/// Errors returned by [`crate::ConversionService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The URL does not match the accepted YouTube shape.
    #[error("Invalid YouTube URL")]
    InvalidUrl,

    /// A conversion option (format, quality, resolution) was rejected.
    #[error("{0}")]
    InvalidOption(String),

    /// Metadata lookup failed; the message is safe to show to the caller.
    #[error("{0}")]
    Extraction(#[source] ExtractorError),

    /// Conversion failed; detail is for operators only.
    #[error("conversion failed: {0}")]
    Conversion(#[source] ExtractorError),
}
