// ABOUTME: Minimal Telegram Bot API client: long-poll updates, outbound messages, attachment download

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Long-poll window requested from the endpoint.
const POLL_TIMEOUT_SECS: u64 = 30;
/// Timeout for control calls (send, getFile).
const CONTROL_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for bulk attachment transfer.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("network error talking to Telegram: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("attachment download failed: {0}")]
    Download(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    file_path: Option<String>,
}

/// Attachment fetch seam, so message handling can be exercised without the
/// live transport.
#[async_trait]
pub trait FetchAttachment {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, TelegramError>;
}

pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
}

#[async_trait]
impl FetchAttachment for TelegramClient {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        self.download_document(file_id).await
    }
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: bot_token.to_string(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{method}", self.token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("https://api.telegram.org/file/bot{}/{file_path}", self.token)
    }

    fn check<T>(response: ApiResponse<T>) -> Result<Option<T>, TelegramError> {
        if response.ok {
            Ok(response.result)
        } else {
            Err(TelegramError::Api(
                response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    /// Long-poll for new updates after `offset`. Blocks up to the poll
    /// window on the server side.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let response = self
            .http
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("allowed_updates", r#"["message"]"#.to_string()),
            ])
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 5))
            .send()
            .await?;

        let body: ApiResponse<Vec<Update>> = response.json().await?;
        Ok(Self::check(body)?.unwrap_or_default())
    }

    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let response = self
            .http
            .post(self.api_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
                "disable_web_page_preview": true,
            }))
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;

        let body: ApiResponse<serde_json::Value> = response.json().await?;
        Self::check(body)?;
        Ok(())
    }

    /// Resolve an attachment id to its file path, then fetch the bytes.
    pub async fn download_document(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        let response = self
            .http
            .get(self.api_url("getFile"))
            .query(&[("file_id", file_id)])
            .timeout(CONTROL_TIMEOUT)
            .send()
            .await?;

        let body: ApiResponse<FileInfo> = response.json().await?;
        let file_path = Self::check(body)?
            .and_then(|info| info.file_path)
            .ok_or_else(|| TelegramError::Download("no file path in response".to_string()))?;
        debug!(file_id, %file_path, "downloading attachment");

        let response = self
            .http
            .get(self.file_url(&file_path))
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TelegramError::Download(format!(
                "status {}",
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}
