//! Accepted source-URL shape.
//!
//! Only `youtube.com/watch?v=<id>` and `youtu.be/<id>` links are accepted,
//! with optional scheme and `www.` prefix. The match is anchored at the start
//! only, so trailing query parameters (`&t=42s`, `?si=...`) are allowed.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ServiceError;

static YOUTUBE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)([A-Za-z0-9_-]{11})")
        .expect("youtube url pattern compiles")
});

/// Returns `true` when `url` has a recognised host and an 11-character id.
pub fn is_valid_youtube_url(url: &str) -> bool {
    YOUTUBE_URL.is_match(url)
}

/// Extracts the 11-character video id from an accepted URL.
pub fn video_id(url: &str) -> Option<&str> {
    YOUTUBE_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// [`is_valid_youtube_url`] as a `Result`, for use with `?`.
pub fn validate(url: &str) -> Result<(), ServiceError> {
    if is_valid_youtube_url(url) {
        Ok(())
    } else {
        Err(ServiceError::InvalidUrl)
    }
}
