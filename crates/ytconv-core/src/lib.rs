//! ytconv-core – conversion jobs and their on-disk lifecycle.
//!
//! The crate owns everything below the HTTP layer:
//! - [`url`]: the accepted source-URL shape.
//! - [`job`]: job identity, title sanitisation and output formats.
//! - [`store`]: the flat directory holding converted files.
//! - [`sweeper`]: the background task deleting stale files.
//! - [`extractor`]: the [`Extractor`] seam and its yt-dlp implementation.
//! - [`service`]: the info / convert operations built on top of them.

pub mod error;
pub mod extractor;
pub mod job;
pub mod service;
pub mod store;
pub mod sweeper;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tools;
pub mod url;

pub use error::{ExtractorError, ServiceError};
pub use extractor::{DownloadRequest, Extractor, VideoMetadata, YtDlp, YtDlpConfig};
pub use job::{Job, MediaFormat};
pub use service::{ConversionService, ConvertOptions, ConvertOutcome};
pub use store::{JobStore, RemovalGuard, SweepReport};
pub use sweeper::{Sweeper, SweeperHandle};
