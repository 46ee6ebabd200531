//! Telegram Bot API client
//!
//! Thin reqwest wrapper over the three Bot API calls this service needs
//! (getUpdates, getFile, sendMessage) plus URL construction for the file
//! endpoint that the stream relay proxies from.

use percent_encoding::{AsciiSet, CONTROLS};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Characters escaped inside a file-path segment of a file endpoint URL.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}');

#[derive(Clone)]
pub struct TelegramClient {
    token: String,
    api_base: String,
    http: Client,
}

/// Bot API response envelope: `{ok, result}` on success,
/// `{ok: false, description}` on failure.
#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Result of getFile - the resolve(fileId) contract.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolvedFile {
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub channel_post: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub text: Option<String>,
    pub video: Option<Video>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub mime_type: Option<String>,
}

impl TelegramClient {
    pub fn new(token: &str, api_base: &str) -> Self {
        Self {
            token: token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// URL of a file on the Bot API file endpoint, with path segments
    /// percent-encoded.
    pub fn file_url(&self, file_path: &str) -> String {
        let encoded: Vec<String> = file_path
            .split('/')
            .map(|segment| {
                percent_encoding::utf8_percent_encode(segment, PATH_SEGMENT).to_string()
            })
            .collect();
        format!(
            "{}/file/bot{}/{}",
            self.api_base,
            self.token,
            encoded.join("/")
        )
    }

    /// Unwrap the Bot API envelope, surfacing HTTP and `ok: false`
    /// failures as `TelegramError::Api`.
    async fn read_result<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, TelegramError> {
        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(TelegramError::Api(text));
        }

        let wrapper: ApiResponse<T> = resp.json().await?;
        if !wrapper.ok {
            return Err(TelegramError::Api(
                wrapper
                    .description
                    .unwrap_or_else(|| "unknown Bot API error".to_string()),
            ));
        }
        wrapper
            .result
            .ok_or_else(|| TelegramError::Api("response missing result".to_string()))
    }

    /// Long-poll for updates. Blocks server-side for up to `timeout_secs`
    /// when no updates are pending.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        let mut body = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "channel_post"],
        });
        if let Some(offset) = offset {
            body["offset"] = serde_json::json!(offset);
        }

        let resp = self
            .http
            .post(self.method_url("getUpdates"))
            .json(&body)
            .send()
            .await?;

        Self::read_result(resp).await
    }

    /// Resolve a file id to its path on the file endpoint.
    pub async fn get_file(&self, file_id: &str) -> Result<ResolvedFile, TelegramError> {
        let resp = self
            .http
            .post(self.method_url("getFile"))
            .json(&serde_json::json!({ "file_id": file_id }))
            .send()
            .await?;

        Self::read_result(resp).await
    }

    /// Send a text message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<serde_json::Value>,
    ) -> Result<(), TelegramError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(markup) = reply_markup {
            body["reply_markup"] = markup;
        }

        let resp = self
            .http
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        let _: serde_json::Value = Self::read_result(resp).await?;
        Ok(())
    }

    /// Streaming GET against the file endpoint. The caller drives the
    /// body incrementally via `bytes_stream`; dropping the response
    /// releases the upstream connection.
    pub async fn fetch_file(&self, file_path: &str) -> Result<reqwest::Response, TelegramError> {
        let resp = self.http.get(self.file_url(file_path)).send().await?;
        if !resp.status().is_success() {
            return Err(TelegramError::Api(format!(
                "file endpoint returned {}",
                resp.status()
            )));
        }
        Ok(resp)
    }
}

#[derive(Debug)]
pub enum TelegramError {
    Http(reqwest::Error),
    Api(String),
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::Http(e)
    }
}

impl std::fmt::Display for TelegramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelegramError::Http(e) => write!(f, "HTTP error: {}", e),
            TelegramError::Api(s) => write!(f, "Bot API error: {}", s),
        }
    }
}

impl std::error::Error for TelegramError {}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};

    /// Bind a stub Bot API on an ephemeral port, returning its base URL.
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_file_url_encoding() {
        let client = TelegramClient::new("TOKEN", "https://api.telegram.org");
        assert_eq!(
            client.file_url("videos/clip1.mp4"),
            "https://api.telegram.org/file/botTOKEN/videos/clip1.mp4"
        );
        assert_eq!(
            client.file_url("videos/my clip.mp4"),
            "https://api.telegram.org/file/botTOKEN/videos/my%20clip.mp4"
        );
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let client = TelegramClient::new("TOKEN", "http://localhost:8081/");
        assert_eq!(
            client.file_url("a.mp4"),
            "http://localhost:8081/file/botTOKEN/a.mp4"
        );
    }

    #[tokio::test]
    async fn test_get_file_resolves_path() {
        let router = Router::new().route(
            "/botTOKEN/getFile",
            post(|| async {
                Json(serde_json::json!({
                    "ok": true,
                    "result": { "file_id": "abc", "file_path": "videos/clip1.mp4" }
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let client = TelegramClient::new("TOKEN", &base);
        let resolved = client.get_file("abc").await.unwrap();
        assert_eq!(resolved.file_path.as_deref(), Some("videos/clip1.mp4"));
    }

    #[tokio::test]
    async fn test_get_file_api_error() {
        let router = Router::new().route(
            "/botTOKEN/getFile",
            post(|| async {
                Json(serde_json::json!({
                    "ok": false,
                    "description": "Bad Request: invalid file_id"
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let client = TelegramClient::new("TOKEN", &base);
        match client.get_file("nope").await {
            Err(TelegramError::Api(desc)) => assert!(desc.contains("invalid file_id")),
            other => panic!("expected Api error, got {:?}", other.map(|r| r.file_path)),
        }
    }

    #[tokio::test]
    async fn test_get_updates_parses_channel_post() {
        let router = Router::new().route(
            "/botTOKEN/getUpdates",
            post(|| async {
                Json(serde_json::json!({
                    "ok": true,
                    "result": [{
                        "update_id": 42,
                        "channel_post": {
                            "chat": { "id": -100, "username": "mychannel" },
                            "video": { "file_id": "abc", "mime_type": "video/mp4" }
                        }
                    }]
                }))
            }),
        );
        let base = spawn_stub(router).await;

        let client = TelegramClient::new("TOKEN", &base);
        let updates = client.get_updates(None, 0).await.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 42);

        let post = updates[0].channel_post.as_ref().unwrap();
        assert_eq!(post.chat.username.as_deref(), Some("mychannel"));
        assert_eq!(post.video.as_ref().unwrap().file_id, "abc");
        assert!(updates[0].message.is_none());
    }
}
