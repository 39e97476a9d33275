//! Drowsiness Monitor API Server
//!
//! HTTP control surface for the frame pipeline: start/stop detection, the
//! latest analysis snapshot, Prometheus metrics and the MJPEG video feed.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use frame_pipeline::DetectionControl;
use frame_store::FrameStore;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod config;
mod routes;

pub use config::{AppConfig, LoggingConfig, ServerConfig, StreamConfig};
pub use routes::stream::{mjpeg_part, MJPEG_BOUNDARY, MJPEG_CONTENT_TYPE};

/// Application state shared across handlers
pub struct AppState {
    /// Detection on/off switch shared with the pipeline worker
    pub control: Arc<DetectionControl>,
    /// Latest published frame
    pub store: Arc<FrameStore>,
    /// Stream pacing
    pub stream: StreamConfig,
    /// Prometheus renderer, if a recorder was installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        control: Arc<DetectionControl>,
        store: Arc<FrameStore>,
        stream: StreamConfig,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            control,
            store,
            stream,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(routes::control::root))
        .route("/start", post(routes::control::start))
        .route("/stop", post(routes::control::stop))
        .route("/status", get(routes::status::status))
        .route("/metrics", get(routes::status::metrics))
        .route("/video_feed", get(routes::stream::video_feed))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS for the dashboard origins, credentials allowed
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let level: Level = config
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", config.level))?;

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    installed.context("Failed to set tracing subscriber")
}

/// Install the global Prometheus recorder
pub fn install_metrics() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

/// Run the server until Ctrl-C
pub async fn run_server(state: Arc<AppState>, config: &ServerConfig) -> anyhow::Result<()> {
    let app = create_router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!("Starting API server on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    pub(crate) fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(DetectionControl::new(false)),
            Arc::new(FrameStore::new()),
            StreamConfig {
                frame_interval_ms: 5,
                empty_poll_ms: 5,
                client_buffer: 2,
            },
            None,
        ))
    }

    pub(crate) fn test_router(state: Arc<AppState>) -> Router {
        create_router(state, &ServerConfig::default().cors_origins)
    }

    pub(crate) async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let app = test_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/start")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_unknown_origin() {
        let app = test_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(header::ORIGIN, "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[test]
    fn test_invalid_origin_is_skipped() {
        // must not panic
        let _ = cors_layer(&["http://ok.example".to_string(), "bad\norigin".to_string()]);
    }

    #[test]
    fn test_bad_log_level_is_rejected() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            json: false,
        };
        assert!(init_logging(&config).is_err());
    }
}
