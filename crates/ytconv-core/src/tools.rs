//! Discovery of the external binaries: yt-dlp and the bundled ffmpeg.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Resolves the yt-dlp executable.
///
/// Paths with a directory component are used as given; bare names are looked
/// up on `PATH`. Returns `None` when nothing executable is found.
pub fn locate_ytdlp(configured: &Path) -> Option<PathBuf> {
    if configured.components().count() > 1 {
        return configured.is_file().then(|| configured.to_path_buf());
    }
    match which::which(configured) {
        Ok(path) => {
            info!(path = %path.display(), "found yt-dlp");
            Some(path)
        }
        Err(e) => {
            warn!(binary = %configured.display(), error = %e, "yt-dlp not found on PATH");
            None
        }
    }
}

/// Resolves the ffmpeg handed to yt-dlp via `--ffmpeg-location`.
///
/// Order: the configured location if it exists, then the ffmpeg-sidecar
/// directory next to the executable (downloading into it first when
/// `auto_download` is set). `None` lets yt-dlp fall back to its own lookup.
pub async fn resolve_ffmpeg(configured: Option<&Path>, auto_download: bool) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            info!(path = %path.display(), "using configured ffmpeg");
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured ffmpeg location does not exist");
    }

    if let Some(path) = sidecar_ffmpeg() {
        return Some(path);
    }

    if auto_download {
        info!("downloading bundled ffmpeg");
        match tokio::task::spawn_blocking(ffmpeg_sidecar::download::auto_download).await {
            Ok(Ok(())) => return sidecar_ffmpeg(),
            Ok(Err(e)) => warn!(error = %e, "ffmpeg download failed"),
            Err(e) => warn!(error = %e, "ffmpeg download task panicked"),
        }
    }

    None
}

fn sidecar_ffmpeg() -> Option<PathBuf> {
    let path = ffmpeg_sidecar::paths::ffmpeg_path();
    if path.is_file() {
        info!(path = %path.display(), "using bundled ffmpeg");
        Some(path)
    } else {
        None
    }
}
