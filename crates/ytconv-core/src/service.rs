//! Info and convert operations.
//!
//! Both validate the URL before touching the extractor. Convert looks the
//! metadata up again instead of trusting an earlier info call, so the title
//! used for the filename is always the extractor's current one.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{ExtractorError, ServiceError};
use crate::extractor::{DownloadRequest, Extractor, VideoMetadata};
use crate::job::{Job, MediaFormat};
use crate::store::JobStore;

/// Validated conversion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub format: MediaFormat,
    /// Maximum video height.
    pub resolution: u32,
    /// Audio bitrate in kbit/s.
    pub quality: u32,
}

impl ConvertOptions {
    pub const DEFAULT_QUALITY: u32 = 320;
    pub const DEFAULT_RESOLUTION: u32 = 720;

    /// Parses client-supplied option strings; `None` means "use the default".
    pub fn parse(
        quality: Option<&str>,
        resolution: Option<&str>,
        format: Option<&str>,
    ) -> Result<Self, ServiceError> {
        let format = match format.map(str::trim) {
            None | Some("") => MediaFormat::default(),
            Some(f) => f
                .parse()
                .map_err(|_| ServiceError::InvalidOption(format!("Unsupported format '{f}'")))?,
        };
        Ok(Self {
            format,
            resolution: parse_positive(resolution, "resolution", Self::DEFAULT_RESOLUTION)?,
            quality: parse_positive(quality, "quality", Self::DEFAULT_QUALITY)?,
        })
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            format: MediaFormat::default(),
            resolution: Self::DEFAULT_RESOLUTION,
            quality: Self::DEFAULT_QUALITY,
        }
    }
}

fn parse_positive(value: Option<&str>, name: &str, default: u32) -> Result<u32, ServiceError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(default);
    };
    // Accept a trailing unit the way clients tend to send it: "720p", "320k".
    let digits = raw.trim_end_matches(['p', 'P', 'k', 'K']);
    match digits.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ServiceError::InvalidOption(format!("Invalid {name} '{raw}'"))),
    }
}

/// A finished conversion.
#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    pub job: Job,
    /// Where the file landed in the store.
    pub path: PathBuf,
}

impl ConvertOutcome {
    pub fn download_url(&self) -> String {
        self.job.download_url()
    }

    pub fn client_filename(&self) -> String {
        self.job.client_filename()
    }
}

pub struct ConversionService {
    extractor: Arc<dyn Extractor>,
    store: JobStore,
}

impl fmt::Debug for ConversionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionService")
            .field("extractor", &self.extractor.id())
            .field("store", &self.store.root())
            .finish()
    }
}

impl ConversionService {
    pub fn new(extractor: Arc<dyn Extractor>, store: JobStore) -> Self {
        Self { extractor, store }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Looks up metadata for `url`.
    pub async fn info(&self, url: &str) -> Result<VideoMetadata, ServiceError> {
        crate::url::validate(url)?;
        info!(url, extractor = self.extractor.id(), "fetching metadata");
        self.extractor.fetch_metadata(url).await.map_err(|e| {
            warn!(url, error = %e, "metadata lookup failed");
            ServiceError::Extraction(e)
        })
    }

    /// Converts `url` into a new job file in the store.
    pub async fn convert(
        &self,
        url: &str,
        options: ConvertOptions,
    ) -> Result<ConvertOutcome, ServiceError> {
        crate::url::validate(url)?;

        let metadata = self
            .extractor
            .fetch_metadata(url)
            .await
            .map_err(ServiceError::Conversion)?;

        let job = Job::new(&metadata.title, options.format);
        let path = self.store.path_for(&job);
        info!(
            url,
            job_id = %job.id(),
            format = %options.format,
            resolution = options.resolution,
            quality = options.quality,
            "starting conversion"
        );

        let request = DownloadRequest {
            format: options.format,
            resolution: options.resolution,
            quality: options.quality,
            output_stem: self.store.stem_path(&job),
        };
        self.extractor
            .download(url, &request)
            .await
            .map_err(ServiceError::Conversion)?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ServiceError::Conversion(ExtractorError::MissingOutput(path)));
        }

        info!(job_id = %job.id(), filename = %job.filename(), "conversion finished");
        Ok(ConvertOutcome { job, path })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeExtractor;

    const URL: &str = "https://youtu.be/dQw4w9WgXcQ";

    async fn service(fake: Arc<FakeExtractor>) -> (tempfile::TempDir, ConversionService) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JobStore::open(dir.path()).await.expect("open store");
        (dir, ConversionService::new(fake, store))
    }

    #[test]
    fn options_default_when_absent() {
        let opts = ConvertOptions::parse(None, None, None).unwrap();
        assert_eq!(opts, ConvertOptions::default());
        assert_eq!(opts.format, MediaFormat::Mp3);
        assert_eq!(opts.quality, 320);
        assert_eq!(opts.resolution, 720);
    }

    #[test]
    fn options_accept_units_and_case() {
        let opts = ConvertOptions::parse(Some("128k"), Some("1080p"), Some("MP4")).unwrap();
        assert_eq!(opts.format, MediaFormat::Mp4);
        assert_eq!(opts.quality, 128);
        assert_eq!(opts.resolution, 1080);
    }

    #[test]
    fn options_reject_garbage() {
        for (q, r, f) in [
            (None, None, Some("exe")),
            (None, Some("tall"), None),
            (Some("0"), None, None),
            (None, Some("-1"), None),
        ] {
            let err = ConvertOptions::parse(q, r, f).unwrap_err();
            assert!(matches!(err, ServiceError::InvalidOption(_)), "{q:?} {r:?} {f:?}");
        }
    }

    #[tokio::test]
    async fn invalid_url_never_reaches_extractor() {
        let fake = Arc::new(FakeExtractor::new("Title"));
        let (_dir, svc) = service(fake.clone()).await;

        assert!(matches!(svc.info("not-a-url").await, Err(ServiceError::InvalidUrl)));
        assert!(matches!(
            svc.convert("not-a-url", ConvertOptions::default()).await,
            Err(ServiceError::InvalidUrl)
        ));
        assert_eq!(fake.metadata_calls(), 0);
        assert_eq!(fake.download_calls(), 0);
    }

    #[tokio::test]
    async fn info_returns_metadata() {
        let fake = Arc::new(FakeExtractor::new("Never Gonna Give You Up"));
        let (_dir, svc) = service(fake.clone()).await;

        let meta = svc.info(URL).await.unwrap();
        assert_eq!(meta.title, "Never Gonna Give You Up");
        assert_eq!(meta.id, "dQw4w9WgXcQ");
        assert_eq!(fake.download_calls(), 0);
    }

    #[tokio::test]
    async fn info_failure_carries_extractor_message() {
        let fake = Arc::new(FakeExtractor::new("x").failing_metadata("ERROR: Video unavailable"));
        let (_dir, svc) = service(fake).await;

        let err = svc.info(URL).await.unwrap_err();
        assert!(matches!(err, ServiceError::Extraction(_)));
        assert_eq!(err.to_string(), "ERROR: Video unavailable");
    }

    #[tokio::test]
    async fn convert_writes_job_file_and_refetches_metadata() {
        let fake = Arc::new(FakeExtractor::new("Never Gonna Give You Up"));
        let (_dir, svc) = service(fake.clone()).await;

        svc.info(URL).await.unwrap();
        let outcome = svc.convert(URL, ConvertOptions::default()).await.unwrap();

        assert_eq!(fake.metadata_calls(), 2);
        assert!(outcome.path.is_file());
        assert_eq!(outcome.client_filename(), "Never_Gonna_Give_You_Up.mp3");
        let id = outcome.job.id().to_string();
        assert!(outcome.download_url().contains(&id));
        assert!(!outcome.client_filename().contains(&id));
        assert_eq!(
            outcome.path.file_name().and_then(|n| n.to_str()),
            Some(outcome.job.filename().as_str())
        );
    }

    #[tokio::test]
    async fn concurrent_conversions_of_same_title_do_not_collide() {
        let fake = Arc::new(FakeExtractor::new("Same"));
        let (_dir, svc) = service(fake).await;

        let (a, b) = tokio::join!(
            svc.convert(URL, ConvertOptions::default()),
            svc.convert(URL, ConvertOptions::default())
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.job.filename(), b.job.filename());
        assert_eq!(a.client_filename(), b.client_filename());
        assert!(a.path.is_file() && b.path.is_file());
    }

    #[tokio::test]
    async fn download_failure_is_a_conversion_error() {
        let fake = Arc::new(FakeExtractor::new("x").failing_download("ERROR: 403"));
        let (_dir, svc) = service(fake).await;

        let err = svc.convert(URL, ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conversion(ExtractorError::Failed { .. })));
    }

    #[tokio::test]
    async fn metadata_failure_during_convert_is_a_conversion_error() {
        let fake = Arc::new(FakeExtractor::new("x").failing_metadata("ERROR: private"));
        let (_dir, svc) = service(fake.clone()).await;

        let err = svc.convert(URL, ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conversion(_)));
        assert_eq!(fake.download_calls(), 0);
    }

    #[tokio::test]
    async fn missing_output_is_a_conversion_error() {
        let fake = Arc::new(FakeExtractor::new("x").without_output());
        let (_dir, svc) = service(fake).await;

        let err = svc.convert(URL, ConvertOptions::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conversion(ExtractorError::MissingOutput(_))));
    }

    #[tokio::test]
    async fn video_conversion_passes_resolution() {
        let fake = Arc::new(FakeExtractor::new("Clip"));
        let (_dir, svc) = service(fake.clone()).await;

        let opts = ConvertOptions::parse(None, Some("480"), Some("mp4")).unwrap();
        let outcome = svc.convert(URL, opts).await.unwrap();

        assert_eq!(outcome.client_filename(), "Clip.mp4");
        let last = fake.last_request().expect("download recorded");
        assert_eq!(last.resolution, 480);
        assert_eq!(last.format, MediaFormat::Mp4);
    }
}
