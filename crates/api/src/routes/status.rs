//! Analysis snapshot and metrics routes

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use frame_store::DetectionSummary;
use serde::Serialize;

use crate::AppState;

/// Response for `GET /status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub version: String,
    pub uptime_seconds: u64,
    pub frames_published: u64,
    /// Latest frame, absent until the first publish
    pub latest: Option<LatestFrame>,
}

#[derive(Debug, Serialize)]
pub struct LatestFrame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
    /// Absent while detection is off
    pub detection: Option<DetectionSummary>,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let latest = state.store.latest().map(|frame| LatestFrame {
        sequence: frame.sequence,
        width: frame.width,
        height: frame.height,
        bytes: frame.jpeg.len(),
        detection: frame.detection.clone(),
    });

    Json(StatusResponse {
        running: state.control.is_enabled(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        frames_published: state.store.total_published(),
        latest,
    })
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::{json_body, test_router, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use frame_store::DetectionSummary;
    use serde_json::json;
    use tower::ServiceExt;

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_status_before_first_frame() {
        let response = test_router(test_state()).oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["running"], json!(false));
        assert_eq!(body["frames_published"], json!(0));
        assert!(body["latest"].is_null());
    }

    #[tokio::test]
    async fn test_status_reports_latest_detection() {
        let state = test_state();
        state.control.enable();
        state.store.publish(vec![0xFF, 0xD8, 0xFF, 0xD9], 450, 338, None);
        state.store.publish(
            vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9],
            450,
            338,
            Some(DetectionSummary {
                faces_detected: 1,
                faces_scored: 1,
                tracked_ear: Some(0.125),
                low_ear_frames: 21,
                alerting: true,
            }),
        );

        let body = json_body(test_router(state).oneshot(get("/status")).await.unwrap()).await;
        assert_eq!(body["running"], json!(true));
        assert_eq!(body["frames_published"], json!(2));
        assert_eq!(body["latest"]["sequence"], json!(2));
        assert_eq!(body["latest"]["bytes"], json!(5));
        assert_eq!(body["latest"]["detection"]["low_ear_frames"], json!(21));
        assert_eq!(body["latest"]["detection"]["tracked_ear"], json!(0.125));
        assert_eq!(body["latest"]["detection"]["alerting"], json!(true));
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let response = test_router(test_state()).oneshot(get("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
