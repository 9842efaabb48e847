/// Outbound reply delivery through the LINE reply API
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// LINE rejects text messages longer than this
const MAX_TEXT_CHARS: usize = 5000;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Reply request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Reply API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sends a text reply to a reply handle
#[async_trait]
pub trait ReplySender: Send + Sync {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage>,
}

#[derive(Debug, Serialize)]
struct TextMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

pub struct LineReplyClient {
    client: reqwest::Client,
    reply_url: String,
    access_token: String,
}

impl LineReplyClient {
    pub fn new(
        api_base: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            reply_url: format!("{}/v2/bot/message/reply", api_base.trim_end_matches('/')),
            access_token: access_token.into(),
        })
    }
}

fn truncate_text(text: &str) -> String {
    if text.chars().count() <= MAX_TEXT_CHARS {
        return text.to_string();
    }
    tracing::warn!("Reply longer than {} characters, truncating", MAX_TEXT_CHARS);
    text.chars().take(MAX_TEXT_CHARS).collect()
}

#[async_trait]
impl ReplySender for LineReplyClient {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError> {
        let request = ReplyRequest {
            reply_token,
            messages: vec![TextMessage {
                kind: "text",
                text: truncate_text(text),
            }],
        };

        let response = self
            .client
            .post(&self.reply_url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
