use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

/// Any origin unless `YTCONV_CORS_ORIGINS` lists at least one usable origin.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let allow_origin = match allowed_origins(config.cors_allowed_origins.as_deref()) {
        Some(origins) => AllowOrigin::list(origins),
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_headers(Any)
        .allow_methods(Any)
}

/// Parses a comma-separated origin list; blank entries are ignored and an
/// empty result means "no restriction".
fn allowed_origins(raw: Option<&str>) -> Option<Vec<HeaderValue>> {
    let origins: Vec<HeaderValue> = raw?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    (!origins.is_empty()).then_some(origins)
}
