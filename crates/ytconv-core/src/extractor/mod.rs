//! The extractor seam.
//!
//! [`Extractor`] isolates the service from the tool that actually talks to
//! YouTube. The production implementation is [`YtDlp`]; tests substitute an
//! in-process fake.

mod ytdlp;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExtractorError;
use crate::job::MediaFormat;

pub use ytdlp::{YtDlp, YtDlpConfig, DEFAULT_HEADERS};

/// The subset of extractor metadata the service uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub id: String,
    pub title: String,
    /// Seconds, passed through exactly as the extractor reported it.
    #[serde(default)]
    pub duration: Option<serde_json::Number>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Parameters for one download/transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub format: MediaFormat,
    /// Maximum video height for video formats.
    pub resolution: u32,
    /// Bitrate the client asked for, in kbit/s. Recorded only: audio is
    /// always extracted at the extractor's best setting.
    pub quality: u32,
    /// Output path without extension; the extractor appends `format`'s.
    pub output_stem: PathBuf,
}

/// Retrieves metadata and media for a source URL.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn id(&self) -> &'static str;

    /// Looks up metadata without writing any file.
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractorError>;

    /// Downloads and transcodes `url` to `{request.output_stem}.{ext}`.
    async fn download(&self, url: &str, request: &DownloadRequest) -> Result<(), ExtractorError>;
}
