//! Ingestion deduplicator
//!
//! Turns a qualifying channel attachment into exactly one stored video
//! record: existence check, file-path resolution against the Bot API,
//! record construction, conflict-guarded insert.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::constants::DEFAULT_VIDEO_MIME;
use crate::domain::videos;
use crate::models::{NewVideo, VideoAttachment, default_streams};
use crate::telegram::{TelegramClient, TelegramError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// A new record was stored under the given id
    Created(i64),
    /// A record with this file id already exists; nothing was written
    Skipped,
}

#[derive(Debug)]
pub enum IngestError {
    /// The platform could not resolve the file id to a path
    Resolution(TelegramError),
    Db(sqlx::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Resolution(e) => write!(f, "file resolution failed: {}", e),
            IngestError::Db(e) => write!(f, "database error: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

/// Ingest one attachment. Duplicate file ids return `Skipped` without
/// side effects; the UNIQUE constraint on file_id catches the
/// check-then-insert race, so two concurrent events for the same file
/// still produce a single record.
pub async fn ingest(
    db: &PgPool,
    telegram: &TelegramClient,
    attachment: &VideoAttachment,
) -> Result<IngestOutcome, IngestError> {
    if videos::find_by_file_id(db, &attachment.file_id)
        .await
        .map_err(IngestError::Db)?
        .is_some()
    {
        return Ok(IngestOutcome::Skipped);
    }

    let resolved = telegram
        .get_file(&attachment.file_id)
        .await
        .map_err(IngestError::Resolution)?;
    let file_path = resolved.file_path.ok_or_else(|| {
        IngestError::Resolution(TelegramError::Api("getFile returned no file_path".to_string()))
    })?;

    let video = build_record(attachment, &file_path, telegram, Utc::now());

    match videos::insert_video(db, &video).await.map_err(IngestError::Db)? {
        Some(id) => Ok(IngestOutcome::Created(id)),
        None => Ok(IngestOutcome::Skipped),
    }
}

/// Build the canonical record for a resolved attachment. The file name is
/// the last segment of the resolved path; the thumbnail is a derived
/// `<path>_thumb.jpg` link on the file endpoint, never validated.
pub fn build_record(
    attachment: &VideoAttachment,
    file_path: &str,
    telegram: &TelegramClient,
    added_at: DateTime<Utc>,
) -> NewVideo {
    let file_name = file_path
        .rsplit('/')
        .next()
        .unwrap_or(file_path)
        .to_string();

    NewVideo {
        file_id: attachment.file_id.clone(),
        file_name,
        mime_type: attachment
            .mime_type
            .clone()
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string()),
        thumbnail_url: telegram.file_url(&format!("{}_thumb.jpg", file_path)),
        added_at,
        streams: default_streams(),
    }
}
