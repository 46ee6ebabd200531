//! Shared data models used across modules

use chrono::{DateTime, Utc};

/// A qualifying file attachment pulled out of a channel post. Carries
/// the platform file id (the dedup key) and the mime type when the
/// source provided one.
#[derive(Debug, Clone)]
pub struct VideoAttachment {
    pub file_id: String,
    pub mime_type: Option<String>,
}

/// A video record from the database
#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VideoRecord {
    pub id: i64,
    pub file_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub thumbnail_url: String,
    pub added_at: DateTime<Utc>,
    pub played: bool,
    pub streams: serde_json::Value,
}

/// Fields for a video record prior to insertion. The store assigns the
/// id and `played` starts out false.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub file_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub thumbnail_url: String,
    pub added_at: DateTime<Utc>,
    pub streams: serde_json::Value,
}

/// Declarative stream metadata attached to every record. No codec
/// introspection happens at ingestion; this is informational only.
pub fn default_streams() -> serde_json::Value {
    serde_json::json!({
        "video": [{ "resolution": "720p", "codec": "h264" }],
        "audio": [{ "language": "en", "codec": "aac" }],
        "subtitles": []
    })
}
