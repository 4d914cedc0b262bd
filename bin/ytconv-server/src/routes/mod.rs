//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, security headers, per-request trace-ID injection)
//! - Per-client rate limiting on `/api/*`
//! - Optional Swagger UI / OpenAPI document endpoint (disable with `YTCONV_ENABLE_SWAGGER=false`)
//! - Health, download and static frontend routes

mod api;
pub mod doc;
mod download;
mod health;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use http::HeaderValue;
use http::header::{REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{cors, rate_limit, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = api::router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::rate_limit_middleware,
    ));

    let mut app = Router::new()
        .nest("/api", api_router)
        .merge(health::router())
        .merge(download::router());

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    let public_dir = &state.config.public_dir;
    if public_dir.is_dir() {
        info!(dir = %public_dir.display(), "serving static frontend");
        app = app.fallback_service(ServeDir::new(public_dir));
    } else {
        warn!(dir = %public_dir.display(), "static frontend directory not found; skipping");
    }

    app
        // Outermost layers execute first on the way in.
        .layer(
            ServiceBuilder::new()
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    X_FRAME_OPTIONS,
                    HeaderValue::from_static("SAMEORIGIN"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    REFERRER_POLICY,
                    HeaderValue::from_static("no-referrer"),
                ))
                .layer(cors::cors_layer(&state.config)),
        )
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use tracing_test::traced_test;
    use ytconv_core::testing::FakeExtractor;
    use ytconv_core::{ConversionService, JobStore};

    use super::*;
    use crate::config::Config;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    struct Harness {
        app: Router,
        fake: Arc<FakeExtractor>,
        store: JobStore,
        dir: TempDir,
    }

    impl Harness {
        async fn new(fake: FakeExtractor) -> Self {
            Self::with_config(fake, |_| {}).await
        }

        async fn with_config(fake: FakeExtractor, tweak: impl FnOnce(&mut Config)) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let mut config = Config {
                downloads_dir: dir.path().join("downloads"),
                public_dir: dir.path().join("public"),
                download_cleanup_delay: Duration::from_millis(20),
                ..Config::default()
            };
            tweak(&mut config);

            let store = JobStore::open(&config.downloads_dir).await.unwrap();
            let fake = Arc::new(fake);
            let converter = ConversionService::new(fake.clone(), store.clone());
            let app = build(Arc::new(AppState::new(config, converter)));
            Self {
                app,
                fake,
                store,
                dir,
            }
        }

        async fn send(&self, req: Request<Body>) -> Response {
            self.app.clone().oneshot(req).await.unwrap()
        }

        async fn post_json(&self, uri: &str, body: Value) -> Response {
            self.send(
                Request::post(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn stored_name(download_url: &str) -> &str {
        download_url.strip_prefix("/download/").unwrap()
    }

    #[tokio::test]
    async fn health_is_ok_with_security_headers() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let resp = h.get("/health").await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(resp.headers()[X_FRAME_OPTIONS], "SAMEORIGIN");
        assert!(resp.headers().contains_key(trace::X_TRACE_ID));
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "ready");
    }

    #[tokio::test]
    async fn cors_allows_any_origin_by_default() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let resp = h
            .send(
                Request::get("/health")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn cors_honours_configured_origins() {
        let h = Harness::with_config(FakeExtractor::new("Test Song"), |config| {
            config.cors_allowed_origins = Some("https://app.example".to_owned());
        })
        .await;

        let allowed = h
            .send(
                Request::get("/health")
                    .header(header::ORIGIN, "https://app.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example"
        );

        let other = h
            .send(
                Request::get("/health")
                    .header(header::ORIGIN, "http://elsewhere.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert!(!other.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn incoming_trace_id_is_echoed() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let id = "6f1c2b1e-8a43-4c55-9d35-2f0e6a7b9c10";

        let resp = h
            .send(
                Request::get("/health")
                    .header(trace::X_TRACE_ID, id)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(resp.headers()[trace::X_TRACE_ID], id);

        let resp = h
            .send(
                Request::get("/health")
                    .header(trace::X_TRACE_ID, "not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        let generated = resp.headers()[trace::X_TRACE_ID].to_str().unwrap();
        assert_ne!(generated, "not-a-uuid");
        assert!(uuid::Uuid::parse_str(generated).is_ok());
    }

    #[tokio::test]
    async fn info_returns_metadata() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let resp = h.post_json("/api/info", json!({ "url": URL })).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["title"], "Test Song");
        assert_eq!(body["videoId"], "dQw4w9WgXcQ");
        assert_eq!(body["duration"], 212);
        assert!(body["thumbnail"].is_string());
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_without_calling_the_extractor() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;

        for uri in ["/api/info", "/api/convert"] {
            for body in [json!({ "url": "https://vimeo.com/123" }), json!({})] {
                let resp = h.post_json(uri, body).await;
                assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
                assert_eq!(json_body(resp).await["error"], "Invalid YouTube URL");
            }
        }
        assert_eq!(h.fake.metadata_calls(), 0);
        assert_eq!(h.fake.download_calls(), 0);
    }

    #[tokio::test]
    async fn info_failure_surfaces_extractor_message() {
        let h = Harness::new(FakeExtractor::new("x").failing_metadata("Video unavailable")).await;
        let resp = h.post_json("/api/info", json!({ "url": URL })).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await["error"], "Video unavailable");
    }

    #[tokio::test]
    async fn convert_stores_file_under_unique_name() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let resp = h.post_json("/api/convert", json!({ "url": URL })).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["filename"], "Test_Song.mp3");

        let download_url = body["downloadUrl"].as_str().unwrap();
        let stored = stored_name(download_url);
        assert!(stored.ends_with("_Test_Song.mp3"));
        assert!(h.store.root().join(stored).is_file());
    }

    #[tokio::test]
    async fn convert_same_title_twice_gives_distinct_files() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let first = json_body(h.post_json("/api/convert", json!({ "url": URL })).await).await;
        let second = json_body(h.post_json("/api/convert", json!({ "url": URL })).await).await;

        assert_eq!(first["filename"], second["filename"]);
        assert_ne!(first["downloadUrl"], second["downloadUrl"]);
    }

    #[tokio::test]
    async fn convert_passes_options_to_extractor() {
        let h = Harness::new(FakeExtractor::new("Clip")).await;
        let resp = h
            .post_json(
                "/api/convert",
                json!({ "url": URL, "format": "mp4", "resolution": 1080, "quality": "192" }),
            )
            .await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["filename"], "Clip.mp4");
        let request = h.fake.last_request().unwrap();
        assert_eq!(request.resolution, 1080);
        assert_eq!(request.quality, 192);
    }

    #[tokio::test]
    async fn convert_rejects_unsupported_format() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let resp = h
            .post_json("/api/convert", json!({ "url": URL, "format": "exe" }))
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert!(body["error"].as_str().unwrap().contains("Unsupported format"));
        assert_eq!(h.fake.download_calls(), 0);
    }

    #[tokio::test]
    async fn convert_failure_hides_details() {
        for fake in [
            FakeExtractor::new("x").failing_download("ERROR: ffmpeg not found"),
            FakeExtractor::new("x").without_output(),
        ] {
            let h = Harness::new(fake).await;
            let resp = h.post_json("/api/convert", json!({ "url": URL })).await;

            assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(json_body(resp).await["error"], "Conversion failed");
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let resp = h
            .send(
                Request::post("/api/convert")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await["error"].is_string());
    }

    #[tokio::test]
    async fn download_streams_file_then_deletes_it() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let body = json_body(h.post_json("/api/convert", json!({ "url": URL })).await).await;
        let download_url = body["downloadUrl"].as_str().unwrap().to_owned();
        let path = h.store.root().join(stored_name(&download_url));

        let resp = h.get(&download_url).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Test_Song.mp3\""
        );
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], FakeExtractor::CONTENT);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!path.exists());

        let again = h.get(&download_url).await;
        assert_eq!(again.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_download_is_not_found_and_deletes_nothing() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let keep = h.store.root().join("keep.mp3");
        tokio::fs::write(&keep, b"x").await.unwrap();

        let resp = h
            .get("/download/00000000-0000-0000-0000-000000000000_missing.mp3")
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["error"], "File not found");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(keep.exists());
    }

    #[tokio::test]
    async fn download_refuses_path_traversal() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let secret = h.dir.path().join("secret.txt");
        tokio::fs::write(&secret, b"secret").await.unwrap();

        for uri in ["/download/..%2Fsecret.txt", "/download/%2E%2E%2Fsecret.txt"] {
            let resp = h.get(uri).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(secret.exists());
    }

    #[tokio::test]
    #[traced_test]
    async fn api_is_rate_limited_but_health_is_not() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        for _ in 0..10 {
            let resp = h.post_json("/api/info", json!({ "url": URL })).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let resp = h.post_json("/api/info", json!({ "url": URL })).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(json_body(resp).await["error"], "Too many requests");
        assert_eq!(h.fake.metadata_calls(), 10);
        assert!(logs_contain("rate limit exceeded"));

        assert_eq!(h.get("/health").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn static_frontend_is_served_as_fallback() {
        let h = Harness::with_config(FakeExtractor::new("Test Song"), |config| {
            let public = config.public_dir.clone();
            std::fs::create_dir_all(&public).unwrap();
            std::fs::write(public.join("index.html"), "<h1>ytconv</h1>").unwrap();
        })
        .await;

        let resp = h.get("/").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>ytconv</h1>");
    }

    #[tokio::test]
    async fn swagger_document_is_served_when_enabled() {
        let h = Harness::new(FakeExtractor::new("Test Song")).await;
        let resp = h.get("/api-docs/openapi.json").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(json_body(resp).await["paths"]["/api/convert"].is_object());

        let h = Harness::with_config(FakeExtractor::new("Test Song"), |config| {
            config.enable_swagger = false;
        })
        .await;
        assert_eq!(h.get("/api-docs/openapi.json").await.status(), StatusCode::NOT_FOUND);
    }
}
