//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for ytconv-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`, or `0.0.0.0:$PORT`).
    pub bind_address: String,

    /// Job store directory for converted files (default: `"temp_downloads"`).
    pub downloads_dir: PathBuf,

    /// Static frontend directory served as the router fallback; skipped when
    /// it does not exist (default: `"public"`).
    pub public_dir: PathBuf,

    /// yt-dlp executable name or path (default: `"yt-dlp"`).
    pub ytdlp_path: PathBuf,

    /// Bundled ffmpeg binary or directory handed to yt-dlp.
    pub ffmpeg_location: Option<PathBuf>,

    /// Download ffmpeg next to the executable when none is found.
    pub ffmpeg_auto_download: bool,

    /// Kill an extractor run after this long; `None` disables the limit.
    pub extractor_timeout: Option<Duration>,

    /// How often the sweeper scans the job store.
    pub sweep_interval: Duration,

    /// Files older than this are deleted by the sweeper.
    pub max_file_age: Duration,

    /// Delay between the end of a download and deletion of its file.
    pub download_cleanup_delay: Duration,

    /// Rate-limit window for `/api/*`.
    pub rate_limit_window: Duration,

    /// Requests allowed per client per window.
    pub rate_limit_max: u32,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI and the OpenAPI document.
    pub enable_swagger: bool,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Also write logs to a daily-rotated file in this directory.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_owned(),
            downloads_dir: PathBuf::from("temp_downloads"),
            public_dir: PathBuf::from("public"),
            ytdlp_path: PathBuf::from("yt-dlp"),
            ffmpeg_location: None,
            ffmpeg_auto_download: false,
            extractor_timeout: Some(Duration::from_secs(900)),
            sweep_interval: Duration::from_secs(5 * 60),
            max_file_age: Duration::from_secs(60 * 60),
            download_cleanup_delay: Duration::from_secs(5),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 10,
            cors_allowed_origins: None,
            enable_swagger: true,
            log_level: "info".to_owned(),
            log_json: false,
            log_dir: None,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        let bind_address = std::env::var("YTCONV_BIND")
            .ok()
            .or_else(|| std::env::var("PORT").ok().map(|port| format!("0.0.0.0:{port}")))
            .unwrap_or(d.bind_address);

        Self {
            bind_address,
            downloads_dir: env_path("YTCONV_DOWNLOAD_DIR").unwrap_or(d.downloads_dir),
            public_dir: env_path("YTCONV_PUBLIC_DIR").unwrap_or(d.public_dir),
            ytdlp_path: env_path("YTCONV_YTDLP").unwrap_or(d.ytdlp_path),
            ffmpeg_location: env_path("YTCONV_FFMPEG_LOCATION"),
            ffmpeg_auto_download: env_flag("YTCONV_FFMPEG_AUTO_DOWNLOAD", d.ffmpeg_auto_download),
            // `0` disables the limit.
            extractor_timeout: match std::env::var("YTCONV_EXTRACTOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
            {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => d.extractor_timeout,
            },
            sweep_interval: env_secs("YTCONV_SWEEP_INTERVAL_SECS", d.sweep_interval),
            max_file_age: env_secs("YTCONV_MAX_FILE_AGE_SECS", d.max_file_age),
            download_cleanup_delay: Duration::from_millis(parse_env(
                "YTCONV_DOWNLOAD_CLEANUP_DELAY_MS",
                d.download_cleanup_delay.as_millis() as u64,
            )),
            rate_limit_window: env_secs("YTCONV_RATE_LIMIT_WINDOW_SECS", d.rate_limit_window),
            rate_limit_max: parse_env("YTCONV_RATE_LIMIT_MAX", d.rate_limit_max),
            cors_allowed_origins: std::env::var("YTCONV_CORS_ORIGINS").ok(),
            enable_swagger: env_flag("YTCONV_ENABLE_SWAGGER", d.enable_swagger),
            log_level: env_or("YTCONV_LOG", &d.log_level),
            log_json: env_flag("YTCONV_LOG_JSON", d.log_json),
            log_dir: env_path("YTCONV_LOG_DIR"),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_env(key, default.as_secs()))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
