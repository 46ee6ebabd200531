//! Video domain - DB queries for the video record store
//!
//! All functions use the generic Executor pattern, allowing them to work
//! with both `&PgPool` (for standalone queries) and `&mut PgConnection`
//! (for transactions).

use sqlx::{Executor, PgPool, Postgres};

use crate::models::{NewVideo, VideoRecord};

/// Create the videos table on startup if it does not exist yet. The
/// UNIQUE constraint on file_id is what makes ingestion idempotent under
/// concurrent duplicate events.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS videos (
            id BIGSERIAL PRIMARY KEY,
            file_id TEXT NOT NULL UNIQUE,
            file_name TEXT NOT NULL,
            mime_type TEXT NOT NULL,
            thumbnail_url TEXT NOT NULL,
            added_at TIMESTAMPTZ NOT NULL,
            played BOOLEAN NOT NULL DEFAULT FALSE,
            streams JSONB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Look up a record id by the platform file id (the dedup key)
pub async fn find_by_file_id<'e, E>(
    executor: E,
    file_id: &str,
) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM videos WHERE file_id = $1")
        .bind(file_id)
        .fetch_optional(executor)
        .await?;
    Ok(row.map(|r| r.0))
}

/// Insert a new video record. Returns None when a record with the same
/// file_id already exists - the conflict is the atomic dedup guard, so a
/// lost check-then-insert race surfaces here instead of as a duplicate.
pub async fn insert_video<'e, E>(executor: E, video: &NewVideo) -> Result<Option<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        INSERT INTO videos (file_id, file_name, mime_type, thumbnail_url, added_at, played, streams)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6)
        ON CONFLICT (file_id) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(&video.file_id)
    .bind(&video.file_name)
    .bind(&video.mime_type)
    .bind(&video.thumbnail_url)
    .bind(video.added_at)
    .bind(&video.streams)
    .fetch_optional(executor)
    .await?;
    Ok(row.map(|r| r.0))
}

/// All unplayed records in playlist order (oldest first)
pub async fn list_unplayed<'e, E>(executor: E) -> Result<Vec<VideoRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, file_id, file_name, mime_type, thumbnail_url, added_at, played, streams
        FROM videos
        WHERE played = FALSE
        ORDER BY added_at ASC, id ASC
        "#,
    )
    .fetch_all(executor)
    .await
}

/// Get a single record by id
pub async fn get_video<'e, E>(executor: E, id: i64) -> Result<Option<VideoRecord>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, file_id, file_name, mime_type, thumbnail_url, added_at, played, streams
        FROM videos
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Mark a record as played. Matches the row regardless of its current
/// flag, so repeat calls succeed identically. Returns false when the id
/// does not exist.
pub async fn mark_played<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("UPDATE videos SET played = TRUE WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
