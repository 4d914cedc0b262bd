//! Job identity and naming.
//!
//! A job has no record outside the filesystem: its stored filename
//! `{id}_{title}.{ext}` is the whole identity. The random id keeps names
//! unique; the client-facing name drops it again.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use uuid::Uuid;

const MAX_TITLE_LEN: usize = 120;
const FALLBACK_TITLE: &str = "video";

/// Length of a hyphenated UUID, the id prefix of every stored filename.
const ID_LEN: usize = 36;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\s-]").expect("non-word pattern compiles"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Output container a client may ask for.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    #[default]
    Mp3,
    M4a,
    Opus,
    Wav,
    Flac,
    Mp4,
}

impl MediaFormat {
    /// `true` for formats that keep the video stream.
    pub fn is_video(self) -> bool {
        matches!(self, MediaFormat::Mp4)
    }

    /// File extension, which is also the yt-dlp `--audio-format` value.
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "mp3",
            MediaFormat::M4a => "m4a",
            MediaFormat::Opus => "opus",
            MediaFormat::Wav => "wav",
            MediaFormat::Flac => "flac",
            MediaFormat::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "audio/mpeg",
            MediaFormat::M4a => "audio/mp4",
            MediaFormat::Opus => "audio/ogg",
            MediaFormat::Wav => "audio/wav",
            MediaFormat::Flac => "audio/flac",
            MediaFormat::Mp4 => "video/mp4",
        }
    }

    /// Infers the format from a stored file's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

/// Strips everything but ASCII word characters, hyphens and whitespace, then
/// collapses whitespace runs into `_`.
///
/// The result is always ASCII, at most [`MAX_TITLE_LEN`] characters and never
/// empty, so it is safe both as a path component and in a header value.
pub fn sanitize_title(title: &str) -> String {
    let stripped = NON_WORD.replace_all(title, "");
    let collapsed = WHITESPACE.replace_all(&stripped, "_");
    let truncated: String = collapsed.chars().take(MAX_TITLE_LEN).collect();
    if truncated.is_empty() {
        FALLBACK_TITLE.to_owned()
    } else {
        truncated
    }
}

/// Returns the name a client should see for a stored file: the stored name
/// without its `{uuid}_` prefix. Names without that prefix are returned as-is.
pub fn client_filename(stored: &str) -> &str {
    match (stored.get(..ID_LEN), stored.get(ID_LEN..)) {
        (Some(prefix), Some(rest)) if Uuid::parse_str(prefix).is_ok() => {
            rest.strip_prefix('_').unwrap_or(stored)
        }
        _ => stored,
    }
}

/// One conversion's identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: Uuid,
    title: String,
    format: MediaFormat,
}

impl Job {
    /// Creates a job with a fresh random id for the extractor-reported `title`.
    pub fn new(title: &str, format: MediaFormat) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: sanitize_title(title),
            format,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn sanitized_title(&self) -> &str {
        &self.title
    }

    pub fn format(&self) -> MediaFormat {
        self.format
    }

    /// Stored name without extension: `{id}_{title}`.
    pub fn stem(&self) -> String {
        format!("{}_{}", self.id, self.title)
    }

    /// Stored name: `{id}_{title}.{ext}`.
    pub fn filename(&self) -> String {
        format!("{}.{}", self.stem(), self.format.extension())
    }

    /// Name offered to the client: `{title}.{ext}`.
    pub fn client_filename(&self) -> String {
        format!("{}.{}", self.title, self.format.extension())
    }

    /// Locator the client uses to fetch the file.
    pub fn download_url(&self) -> String {
        format!("/download/{}", self.filename())
    }
}
