//! Playlist endpoints (/api/playlist, /api/played/{id})

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;
use crate::domain::videos;
use crate::models::VideoRecord;
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/playlist", get(get_playlist))
        .route("/api/played/{id}", post(mark_played))
}

#[derive(Debug, Serialize)]
struct PlaylistEntry {
    id: i64,
    title: String,
    thumbnail: String,
    streams: serde_json::Value,
}

fn playlist_entry(video: VideoRecord) -> PlaylistEntry {
    PlaylistEntry {
        id: video.id,
        title: video.file_name,
        thumbnail: video.thumbnail_url,
        streams: video.streams,
    }
}

/// GET /api/playlist - All unplayed videos, oldest first
async fn get_playlist(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PlaylistEntry>>, StatusCode> {
    let videos = videos::list_unplayed(&state.db)
        .await
        .log_500("List unplayed videos error")?;

    Ok(Json(videos.into_iter().map(playlist_entry).collect()))
}

#[derive(Serialize)]
struct MarkPlayedResponse {
    status: &'static str,
}

/// POST /api/played/{id} - Flag a video as played. Idempotent: repeat
/// calls on an already-played video succeed identically.
async fn mark_played(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<i64>,
) -> Result<Json<MarkPlayedResponse>, StatusCode> {
    let updated = videos::mark_played(&state.db, video_id)
        .await
        .log_500("Mark played error")?;

    if !updated {
        return Err(StatusCode::NOT_FOUND);
    }

    Ok(Json(MarkPlayedResponse { status: "success" }))
}
