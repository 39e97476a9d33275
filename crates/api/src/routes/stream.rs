//! MJPEG video feed
//!
//! Each client gets its own task sampling the frame store on a fixed interval.
//! The task ends when the client goes away and the channel closes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use frame_store::FrameStore;
use metrics::gauge;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::{AppState, StreamConfig};

pub const MJPEG_BOUNDARY: &str = "frame";
pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

type Part = Result<Bytes, Infallible>;

/// One multipart part wrapping a JPEG
pub fn mjpeg_part(jpeg: &[u8]) -> Bytes {
    let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", MJPEG_BOUNDARY);
    let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}

pub async fn video_feed(State(state): State<Arc<AppState>>) -> Response {
    let (tx, rx) = mpsc::channel(state.stream.client_buffer.max(1));
    tokio::spawn(feed_client(state.store.clone(), state.stream.clone(), tx));

    (
        [
            (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

async fn feed_client(store: Arc<FrameStore>, config: StreamConfig, tx: mpsc::Sender<Part>) {
    gauge!("stream_clients").increment(1.0);
    debug!("video_feed client connected");

    let mut sent = 0u64;
    while !tx.is_closed() {
        let Some(frame) = store.latest() else {
            tokio::time::sleep(config.empty_poll()).await;
            continue;
        };

        if tx.send(Ok(mjpeg_part(&frame.jpeg))).await.is_err() {
            break;
        }
        sent += 1;
        tokio::time::sleep(config.frame_interval()).await;
    }

    gauge!("stream_clients").decrement(1.0);
    debug!("video_feed client gone after {} parts", sent);
}
