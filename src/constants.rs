//! Application constants

/// Default Telegram Bot API base URL (override with TELEGRAM_API_BASE)
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Long-poll timeout for getUpdates (seconds)
pub const POLL_TIMEOUT_SECS: u64 = 30;

/// Initial delay between failed poll attempts (seconds)
pub const POLL_BACKOFF_SECS: u64 = 1;

/// Maximum delay between failed poll attempts (seconds)
pub const MAX_POLL_BACKOFF_SECS: u64 = 60;

/// Capacity of the queue between the listener and the ingest workers
pub const INGEST_QUEUE_CAPACITY: usize = 64;

/// Number of concurrent ingest workers
pub const INGEST_WORKERS: usize = 4;

/// Fallback mime type when the source attachment omits one
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";
