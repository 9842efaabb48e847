/// Inbound webhook body
use super::GatewayError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "replyToken", default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// The two fields the bot needs from an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub text: String,
    pub reply_token: String,
}

/// Pull the user text and reply token out of the first event
///
/// Returns `Ok(None)` for a body with no events (the platform's endpoint
/// verification request).
pub fn extract_message(body: &[u8]) -> Result<Option<InboundMessage>, GatewayError> {
    let payload: WebhookPayload = serde_json::from_slice(body)
        .map_err(|e| GatewayError::MalformedPayload(format!("invalid JSON: {}", e)))?;

    let Some(event) = payload.events.into_iter().next() else {
        return Ok(None);
    };

    let text = event
        .message
        .and_then(|m| m.text)
        .ok_or_else(|| GatewayError::MalformedPayload("missing events[0].message.text".into()))?;

    let reply_token = event
        .reply_token
        .ok_or_else(|| GatewayError::MalformedPayload("missing events[0].replyToken".into()))?;

    Ok(Some(InboundMessage { text, reply_token }))
}
