//! Liveness and start/stop routes

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Response for `GET /`
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub status: &'static str,
    pub running: bool,
}

/// Response for the control routes
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub message: &'static str,
}

pub async fn root(State(state): State<Arc<AppState>>) -> Json<RootResponse> {
    Json(RootResponse {
        status: "backend live",
        running: state.control.is_enabled(),
    })
}

/// Enable detection; idempotent
pub async fn start(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    state.control.enable();
    Json(ControlResponse {
        message: "Drowsiness detection started.",
    })
}

/// Disable detection; idempotent
pub async fn stop(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    state.control.disable();
    Json(ControlResponse {
        message: "Drowsiness detection stopped.",
    })
}

#[cfg(test)]
mod tests {
    use crate::tests::{json_body, test_router, test_state};
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_root_reports_running_flag() {
        let state = test_state();

        let response = test_router(state.clone())
            .oneshot(request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({"status": "backend live", "running": false})
        );

        state.control.enable();
        let response = test_router(state)
            .oneshot(request(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["running"], json!(true));
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let state = test_state();

        for _ in 0..2 {
            let response = test_router(state.clone())
                .oneshot(request(Method::POST, "/start"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                json_body(response).await,
                json!({"message": "Drowsiness detection started."})
            );
            assert!(state.control.is_enabled());
        }

        for _ in 0..2 {
            let response = test_router(state.clone())
                .oneshot(request(Method::POST, "/stop"))
                .await
                .unwrap();
            assert_eq!(
                json_body(response).await,
                json!({"message": "Drowsiness detection stopped."})
            );
            assert!(!state.control.is_enabled());
        }
    }

    #[tokio::test]
    async fn test_start_requires_post() {
        let response = test_router(test_state())
            .oneshot(request(Method::GET, "/start"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
