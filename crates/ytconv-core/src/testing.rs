//! In-process [`Extractor`] for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::ExtractorError;
use crate::extractor::{DownloadRequest, Extractor, VideoMetadata};

/// Answers metadata from memory and "downloads" by writing a small file.
#[derive(Debug)]
pub struct FakeExtractor {
    title: String,
    metadata_error: Option<String>,
    download_error: Option<String>,
    write_output: bool,
    metadata_calls: AtomicUsize,
    download_calls: AtomicUsize,
    last_request: Mutex<Option<DownloadRequest>>,
}

impl FakeExtractor {
    pub const CONTENT: &'static [u8] = b"fake media payload";

    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            metadata_error: None,
            download_error: None,
            write_output: true,
            metadata_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing_metadata(mut self, message: &str) -> Self {
        self.metadata_error = Some(message.to_owned());
        self
    }

    pub fn failing_download(mut self, message: &str) -> Self {
        self.download_error = Some(message.to_owned());
        self
    }

    /// Report success without writing the output file.
    pub fn without_output(mut self) -> Self {
        self.write_output = false;
        self
    }

    pub fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<DownloadRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn failed(message: &str) -> ExtractorError {
    ExtractorError::Failed {
        status: Some(1),
        message: message.to_owned(),
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn id(&self) -> &'static str {
        "fake"
    }

    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractorError> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.metadata_error {
            return Err(failed(message));
        }
        Ok(VideoMetadata {
            id: crate::url::video_id(url).unwrap_or_default().to_owned(),
            title: self.title.clone(),
            duration: Some(serde_json::Number::from(212u32)),
            thumbnail: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/maxresdefault.jpg".to_owned()),
        })
    }

    async fn download(&self, _url: &str, request: &DownloadRequest) -> Result<(), ExtractorError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());
        if let Some(message) = &self.download_error {
            return Err(failed(message));
        }
        if self.write_output {
            let mut path = request.output_stem.clone().into_os_string();
            path.push(".");
            path.push(request.format.extension());
            tokio::fs::write(&path, Self::CONTENT)
                .await
                .map_err(|e| failed(&e.to_string()))?;
        }
        Ok(())
    }
}
