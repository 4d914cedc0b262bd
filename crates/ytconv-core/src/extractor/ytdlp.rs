//! yt-dlp backed [`Extractor`].
//!
//! Every invocation is a fresh child process. The bundled ffmpeg is passed
//! with `--ffmpeg-location` on each call rather than through the process
//! environment.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error, info};

use super::{DownloadRequest, Extractor, VideoMetadata};
use crate::error::ExtractorError;

/// Request headers sent with every download to improve compatibility.
pub const DEFAULT_HEADERS: &[&str] = &["referer:youtube.com", "user-agent:googlebot"];

/// yt-dlp's best VBR setting; audio is always extracted at it.
const BEST_AUDIO_QUALITY: &str = "0";

/// How to launch yt-dlp.
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    /// yt-dlp executable.
    pub binary: PathBuf,
    /// ffmpeg binary or the directory holding it.
    pub ffmpeg_location: Option<PathBuf>,
    /// `name:value` pairs passed with `--add-header` on downloads.
    pub headers: Vec<String>,
    /// Kill the child after this long; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            ffmpeg_location: None,
            headers: DEFAULT_HEADERS.iter().map(|h| (*h).to_owned()).collect(),
            timeout: None,
        }
    }
}

pub struct YtDlp {
    config: YtDlpConfig,
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &YtDlpConfig {
        &self.config
    }

    /// Arguments for a metadata-only run.
    pub fn metadata_args(&self, url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--dump-single-json",
            "--no-warnings",
            "--no-check-certificates",
            "--prefer-free-formats",
            "--no-playlist",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        self.push_ffmpeg_location(&mut args);
        args.push("--".into());
        args.push(url.into());
        args
    }

    /// Arguments for a download/transcode run.
    pub fn download_args(&self, url: &str, request: &DownloadRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let ext = request.format.extension();

        if request.format.is_video() {
            let height = request.resolution;
            args.push("-f".into());
            args.push(
                format!(
                    "bestvideo[height<={height}][ext=mp4]+bestaudio[ext=m4a]\
                     /best[height<={height}][ext=mp4]/best"
                )
                .into(),
            );
            args.push("--merge-output-format".into());
            args.push(ext.into());
            args.push("--remux-video".into());
            args.push(ext.into());
        } else {
            args.push("--extract-audio".into());
            args.push("--audio-format".into());
            args.push(ext.into());
            args.push("--audio-quality".into());
            args.push(BEST_AUDIO_QUALITY.into());
        }

        args.push("--output".into());
        args.push(output_template(&request.output_stem).into());
        args.push("--no-warnings".into());
        args.push("--no-playlist".into());
        // Keep the file's mtime at conversion time; the sweeper ages files by it.
        args.push("--no-mtime".into());
        for header in &self.config.headers {
            args.push("--add-header".into());
            args.push(header.into());
        }
        self.push_ffmpeg_location(&mut args);
        args.push("--".into());
        args.push(url.into());
        args
    }

    fn push_ffmpeg_location(&self, args: &mut Vec<OsString>) {
        if let Some(location) = &self.config.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.into());
        }
    }

    /// Runs yt-dlp and returns its stdout on success.
    async fn run(&self, args: Vec<OsString>) -> Result<Vec<u8>, ExtractorError> {
        let binary = self.config.binary.display().to_string();
        debug!(%binary, ?args, "spawning yt-dlp");

        let child = Command::new(&self.config.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| ExtractorError::Timeout(limit))?,
            None => child.await,
        }
        .map_err(|source| ExtractorError::Spawn { binary, source })?;

        if output.status.success() {
            return Ok(output.stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = summarize_stderr(&stderr)
            .unwrap_or_else(|| format!("yt-dlp exited with {}", output.status));
        error!(status = ?output.status.code(), stderr = %stderr.trim(), "yt-dlp failed");
        Err(ExtractorError::Failed {
            status: output.status.code(),
            message,
        })
    }
}

#[async_trait]
impl Extractor for YtDlp {
    fn id(&self) -> &'static str {
        "yt-dlp"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractorError> {
        let stdout = self.run(self.metadata_args(url)).await?;
        let metadata: VideoMetadata = serde_json::from_slice(&stdout)?;
        info!(video_id = %metadata.id, title = %metadata.title, "fetched metadata");
        Ok(metadata)
    }

    async fn download(&self, url: &str, request: &DownloadRequest) -> Result<(), ExtractorError> {
        self.run(self.download_args(url, request)).await?;
        Ok(())
    }
}

/// `{stem}.%(ext)s`, with `%` in the stem escaped for yt-dlp's template syntax.
fn output_template(stem: &std::path::Path) -> String {
    format!("{}.%(ext)s", stem.to_string_lossy().replace('%', "%%"))
}

/// Picks the user-meaningful part of yt-dlp's stderr.
fn summarize_stderr(stderr: &str) -> Option<String> {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("ERROR:"))
        .collect();
    if !errors.is_empty() {
        return Some(errors.join("\n"));
    }
    stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(str::to_owned)
}
