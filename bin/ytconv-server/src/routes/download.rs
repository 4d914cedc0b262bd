//! `GET /download/{filename}`: one-shot file delivery from the job store.
//!
//! The response body owns a [`ytconv_core::RemovalGuard`]; when the body is
//! finished or dropped the file is deleted after the configured delay.

use std::path::Path as FsPath;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::info;
use utoipa::OpenApi;
use ytconv_core::job::client_filename;
use ytconv_core::{MediaFormat, RemovalGuard};

use crate::error::ServerError;
use crate::schemas::api::ErrorResponse;
use crate::state::AppState;

const NOT_FOUND: &str = "File not found";

#[derive(OpenApi)]
#[openapi(paths(download), components(schemas(ErrorResponse)))]
pub struct DownloadApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/download/{filename}", get(download))
}

#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "download",
    params(("filename" = String, Path, description = "Stored filename from `downloadUrl`")),
    responses(
        (status = 200, description = "File attachment", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    let path = state
        .store
        .resolve(&filename)
        .await
        .ok_or_else(|| ServerError::NotFound(NOT_FOUND.to_owned()))?;

    // The sweeper may win the race between resolve and open.
    let file = match File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound(NOT_FOUND.to_owned()));
        }
        Err(e) => return Err(e.into()),
    };
    let length = file.metadata().await?.len();

    let client_name = client_filename(&filename);
    info!(%filename, client_name, bytes = length, "serving download");

    let guard = state
        .store
        .removal_guard(path.clone(), state.config.download_cleanup_delay);
    let stream = GuardedStream {
        inner: ReaderStream::new(file),
        _guard: guard,
    };

    let mut response = (StatusCode::OK, Body::from_stream(stream)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type(&path)));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(client_name)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// File body that owns its [`RemovalGuard`], so deletion is scheduled when
/// hyper drops the body after the last chunk or on disconnect.
struct GuardedStream {
    inner: ReaderStream<File>,
    _guard: RemovalGuard,
}

impl Stream for GuardedStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

fn content_type(path: &FsPath) -> &'static str {
    MediaFormat::from_path(path)
        .map(MediaFormat::mime_type)
        .unwrap_or("application/octet-stream")
}

/// `attachment; filename="..."` with anything outside printable ASCII, quotes
/// and backslashes replaced by `_`.
fn content_disposition(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}
