//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use ytconv_core::{ConversionService, JobStore};

use crate::config::Config;
use crate::middleware::rate_limit::RateLimiter;

/// State shared across all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Directory of converted files awaiting download.
    pub store: JobStore,
    /// Info / convert operations over the extractor.
    pub converter: Arc<ConversionService>,
    /// Per-client request budget for `/api/*`.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(config: Config, converter: ConversionService) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_window, config.rate_limit_max);
        Self {
            store: converter.store().clone(),
            config: Arc::new(config),
            converter: Arc::new(converter),
            limiter: Arc::new(limiter),
        }
    }
}
