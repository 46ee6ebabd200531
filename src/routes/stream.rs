//! Video stream relay (/video/{id})
//!
//! Proxies bytes from the Bot API file endpoint to the HTTP caller
//! chunk-by-chunk. The upstream response is never buffered whole; the
//! relayed body is the reqwest byte stream itself, so a client
//! disconnect drops the stream and releases the upstream connection.

use axum::{
    Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
    routing::get,
};
use std::sync::Arc;

use crate::AppState;
use crate::domain::videos;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/video/{id}", get(stream_video))
}

/// Content-Disposition for viewing in place rather than downloading
fn inline_disposition(file_name: &str) -> String {
    format!("inline; filename=\"{}\"", file_name)
}

/// GET /video/{id} - Relay the video bytes from the file endpoint.
/// Content-Type mirrors the upstream response, falling back to the
/// recorded mime type.
async fn stream_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Response, (StatusCode, &'static str)> {
    let video = videos::get_video(&state.db, video_id)
        .await
        .map_err(|e| {
            eprintln!("[stream] Video lookup error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?
        .ok_or((StatusCode::NOT_FOUND, "Video not found"))?;

    // Upstream failure maps straight to 502; the relay never retries
    let upstream = state.telegram.fetch_file(&video.file_name).await.map_err(|e| {
        eprintln!("[stream] Upstream fetch error for video {}: {}", video_id, e);
        (StatusCode::BAD_GATEWAY, "Upstream fetch failed")
    })?;

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&video.mime_type)
        .to_string();
    let content_length = upstream
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            inline_disposition(&video.file_name),
        );
    if let Some(length) = content_length {
        response = response.header(header::CONTENT_LENGTH, length);
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| {
            eprintln!("[stream] Response build error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::{TelegramClient, TelegramError};
    use axum::routing::get as get_route;
    use bytes::Bytes;
    use futures::StreamExt;

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_inline_disposition() {
        assert_eq!(
            inline_disposition("clip1.mp4"),
            "inline; filename=\"clip1.mp4\""
        );
    }

    #[tokio::test]
    async fn test_streaming_passthrough() {
        // 256 KiB upstream body, served in one response
        let payload = Bytes::from(vec![7u8; 256 * 1024]);
        let body = payload.clone();
        let router = Router::new().route(
            "/file/botTOKEN/{*path}",
            get_route(move || {
                let body = body.clone();
                async move { ([(header::CONTENT_TYPE, "video/mp4")], body) }
            }),
        );
        let base = spawn_stub(router).await;

        let client = TelegramClient::new("TOKEN", &base);
        let upstream = client.fetch_file("clip1.mp4").await.unwrap();

        assert_eq!(
            upstream
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("video/mp4")
        );

        // Copy chunk-by-chunk and account for every byte
        let mut total = 0usize;
        let mut stream = upstream.bytes_stream();
        while let Some(chunk) = stream.next().await {
            total += chunk.unwrap().len();
        }
        assert_eq!(total, payload.len());
    }

    #[tokio::test]
    async fn test_upstream_error_surfaces() {
        let router = Router::new().route(
            "/file/botTOKEN/{*path}",
            get_route(|| async { (StatusCode::NOT_FOUND, "no such file") }),
        );
        let base = spawn_stub(router).await;

        let client = TelegramClient::new("TOKEN", &base);
        match client.fetch_file("missing.mp4").await {
            Err(TelegramError::Api(msg)) => assert!(msg.contains("404")),
            other => panic!("expected Api error, got {:?}", other.map(|_| "response")),
        }
    }
}
