//! `/api` endpoints: metadata lookup and conversion.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::post;
use axum::{Json, Router};
use utoipa::OpenApi;
use ytconv_core::ConvertOptions;

use crate::error::ServerError;
use crate::schemas::api::{
    ConvertRequest, ConvertResponse, ErrorResponse, InfoRequest, InfoResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(info, convert),
    components(schemas(
        InfoRequest,
        InfoResponse,
        ConvertRequest,
        ConvertResponse,
        ErrorResponse,
    )),
)]
pub struct ConvertApi;

/// Routes nested under `/api`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/info", post(info))
        .route("/convert", post(convert))
}

#[utoipa::path(
    post,
    path = "/api/info",
    tag = "convert",
    request_body = InfoRequest,
    responses(
        (status = 200, description = "Video metadata", body = InfoResponse),
        (status = 400, description = "Invalid YouTube URL", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Extractor error", body = ErrorResponse),
    )
)]
pub async fn info(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<InfoRequest>, JsonRejection>,
) -> Result<Json<InfoResponse>, ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let url = req.url.as_deref().unwrap_or_default();

    let meta = state.converter.info(url).await?;
    Ok(Json(InfoResponse {
        title: meta.title,
        duration: meta.duration,
        thumbnail: meta.thumbnail,
        video_id: meta.id,
    }))
}

#[utoipa::path(
    post,
    path = "/api/convert",
    tag = "convert",
    request_body = ConvertRequest,
    responses(
        (status = 200, description = "Converted file ready for download", body = ConvertResponse),
        (status = 400, description = "Invalid URL or option", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Conversion failed", body = ErrorResponse),
    )
)]
pub async fn convert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let url = req.url.as_deref().unwrap_or_default();

    // URL problems take precedence over option problems.
    ytconv_core::url::validate(url)?;
    let options = ConvertOptions::parse(
        req.quality.as_deref(),
        req.resolution.as_deref(),
        req.format.as_deref(),
    )?;

    let outcome = state.converter.convert(url, options).await?;
    Ok(Json(ConvertResponse {
        download_url: outcome.download_url(),
        filename: outcome.client_filename(),
    }))
}
