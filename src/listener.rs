//! Channel event listener
//!
//! Long-polls the Bot API for updates, filters channel posts down to the
//! configured source channel, and hands qualifying video attachments to a
//! bounded pool of ingest workers so a slow resolve never stalls update
//! delivery. Transient poll failures back off and retry; nothing here is
//! fatal.

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::{Mutex, mpsc};

use crate::constants::{
    INGEST_QUEUE_CAPACITY, INGEST_WORKERS, MAX_POLL_BACKOFF_SECS, POLL_BACKOFF_SECS,
    POLL_TIMEOUT_SECS,
};
use crate::ingest::{self, IngestOutcome};
use crate::models::VideoAttachment;
use crate::telegram::{Chat, Message, TelegramClient};

pub struct ListenerContext {
    pub db: PgPool,
    pub telegram: TelegramClient,
    /// Source channel username, with or without a leading `@`
    pub channel_name: String,
    pub website_url: String,
    /// Admin chat id; reserved for admin-only commands
    #[allow(dead_code)]
    pub admin_id: i64,
}

/// Extract a qualifying attachment from a message: video attachments
/// always qualify, documents only when their mime type is `video/*`.
fn qualify_attachment(message: &Message) -> Option<VideoAttachment> {
    if let Some(video) = &message.video {
        return Some(VideoAttachment {
            file_id: video.file_id.clone(),
            mime_type: video.mime_type.clone(),
        });
    }

    if let Some(document) = &message.document {
        if document
            .mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("video/"))
        {
            return Some(VideoAttachment {
                file_id: document.file_id.clone(),
                mime_type: document.mime_type.clone(),
            });
        }
    }

    None
}

fn is_source_channel(chat: &Chat, channel_name: &str) -> bool {
    chat.username.as_deref() == Some(channel_name)
}

/// Run the listener until the process exits. Spawns the ingest worker
/// pool, then loops on getUpdates with an offset cursor.
pub async fn run_listener(ctx: ListenerContext) {
    let channel_name = ctx
        .channel_name
        .strip_prefix('@')
        .unwrap_or(&ctx.channel_name)
        .to_string();

    let (queue, rx) = mpsc::channel::<VideoAttachment>(INGEST_QUEUE_CAPACITY);
    spawn_ingest_workers(ctx.db.clone(), ctx.telegram.clone(), rx);

    println!(
        "[listener] Watching channel @{} ({} ingest workers)",
        channel_name, INGEST_WORKERS
    );

    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(POLL_BACKOFF_SECS);

    loop {
        match ctx.telegram.get_updates(offset, POLL_TIMEOUT_SECS).await {
            Ok(updates) => {
                backoff = Duration::from_secs(POLL_BACKOFF_SECS);
                for update in updates {
                    offset = Some(update.update_id + 1);

                    if let Some(post) = update.channel_post {
                        if !is_source_channel(&post.chat, &channel_name) {
                            continue;
                        }
                        if let Some(attachment) = qualify_attachment(&post) {
                            // Blocks while the queue is full; events are
                            // never dropped on the floor here.
                            if queue.send(attachment).await.is_err() {
                                eprintln!("[listener] Ingest queue closed, stopping");
                                return;
                            }
                        }
                    } else if let Some(message) = update.message {
                        handle_command(&ctx.telegram, &ctx.website_url, &message).await;
                    }
                }
            }
            Err(e) => {
                eprintln!("[listener] Poll error: {} (retrying in {:?})", e, backoff);
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(Duration::from_secs(MAX_POLL_BACKOFF_SECS));
            }
        }
    }
}

fn spawn_ingest_workers(
    db: PgPool,
    telegram: TelegramClient,
    rx: mpsc::Receiver<VideoAttachment>,
) {
    let rx = Arc::new(Mutex::new(rx));
    for worker in 0..INGEST_WORKERS {
        let rx = rx.clone();
        let db = db.clone();
        let telegram = telegram.clone();
        tokio::spawn(async move {
            loop {
                let attachment = rx.lock().await.recv().await;
                let Some(attachment) = attachment else { break };

                match ingest::ingest(&db, &telegram, &attachment).await {
                    Ok(IngestOutcome::Created(id)) => {
                        println!(
                            "[ingest:{}] Stored video {} (file {})",
                            worker, id, attachment.file_id
                        );
                    }
                    Ok(IngestOutcome::Skipped) => {
                        println!(
                            "[ingest:{}] Skipping duplicate file {}",
                            worker, attachment.file_id
                        );
                    }
                    // Dropped for good: ingestion has no retry or replay
                    Err(e) => {
                        eprintln!(
                            "[ingest:{}] Error for file {}: {}",
                            worker, attachment.file_id, e
                        );
                    }
                }
            }
        });
    }
}

/// Minimal command responder for direct chats. Only /start is handled;
/// everything else is ignored.
async fn handle_command(telegram: &TelegramClient, website_url: &str, message: &Message) {
    let is_start = message
        .text
        .as_deref()
        .is_some_and(|text| text == "/start" || text.starts_with("/start "));
    if !is_start {
        return;
    }

    let keyboard = serde_json::json!({
        "inline_keyboard": [[{ "text": "📺 Watch Videos", "url": website_url }]]
    });
    let text = format!(
        "📺 Welcome to Video TV!\n\n\
         I automatically stream videos from our channel. \
         Visit our website to watch: {}",
        website_url
    );

    if let Err(e) = telegram
        .send_message(message.chat.id, &text, Some(keyboard))
        .await
    {
        eprintln!("[listener] Failed to answer /start: {}", e);
    }
}
