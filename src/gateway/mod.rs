//! Webhook gateway: the HTTP face of the bot
//!
//! Every inbound call is acknowledged with `200 OK` no matter what happens
//! inside, so the platform never retries a delivery. Failures are logged
//! together with the raw payload instead.

mod payload;
mod reply;
mod signature;

pub use payload::{extract_message, InboundMessage, WebhookPayload};
pub use reply::{DeliveryError, LineReplyClient, ReplySender};
pub use signature::{SignatureVerifier, SIGNATURE_HEADER};

use crate::generation::GenerationError;
use crate::resolver::{ReplySource, ResolutionError};
use crate::responder::{RespondError, Responder};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Missing or invalid webhook signature")]
    SignatureInvalid,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Reply delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl From<RespondError> for GatewayError {
    fn from(e: RespondError) -> Self {
        match e {
            RespondError::Resolution(e) => GatewayError::Resolution(e),
            RespondError::Generation(e) => GatewayError::Generation(e),
        }
    }
}

/// What a successfully handled webhook did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Replied(ReplySource),
    NoEvents,
}

pub struct WebhookGateway {
    verifier: SignatureVerifier,
    responder: Arc<Responder>,
    sender: Arc<dyn ReplySender>,
}

impl WebhookGateway {
    pub fn new(
        verifier: SignatureVerifier,
        responder: Arc<Responder>,
        sender: Arc<dyn ReplySender>,
    ) -> Self {
        Self {
            verifier,
            responder,
            sender,
        }
    }

    pub fn responder(&self) -> &Arc<Responder> {
        &self.responder
    }

    /// Verify, resolve and reply for one webhook body
    pub async fn handle(
        &self,
        signature: Option<&str>,
        body: &[u8],
    ) -> Result<Outcome, GatewayError> {
        let signature = signature.ok_or(GatewayError::SignatureInvalid)?;
        if !self.verifier.verify(body, signature) {
            return Err(GatewayError::SignatureInvalid);
        }

        let Some(message) = extract_message(body)? else {
            tracing::debug!("Webhook carried no events");
            return Ok(Outcome::NoEvents);
        };

        let reply = self.responder.respond(&message.text).await?;

        self.sender
            .send_reply(&message.reply_token, &reply.text)
            .await?;

        tracing::info!(
            message = %message.text,
            source = ?reply.source,
            score = ?reply.score,
            "Replied"
        );

        Ok(Outcome::Replied(reply.source))
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
    corpus_entries: usize,
    cached_embeddings: usize,
}

/// Build the router serving the webhook and a health probe
pub fn router(gateway: Arc<WebhookGateway>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(webhook))
        .route("/health", get(health))
        .with_state(gateway)
}

async fn webhook(
    State(gateway): State<Arc<WebhookGateway>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("webhook", %request_id);

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    // Run detached so a panic or client disconnect cannot skip the acknowledgement
    let task_body = body.clone();
    let handled = tokio::spawn(
        async move { gateway.handle(signature.as_deref(), &task_body).await }
            .instrument(span.clone()),
    )
    .await;

    span.in_scope(|| match handled {
        Ok(Ok(outcome)) => tracing::debug!(?outcome, "Webhook handled"),
        Ok(Err(e)) => {
            tracing::error!(
                error = %e,
                payload = %String::from_utf8_lossy(&body),
                "Webhook handling failed"
            );
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                payload = %String::from_utf8_lossy(&body),
                "Webhook task aborted"
            );
        }
    });

    (StatusCode::OK, "OK")
}

async fn health(State(gateway): State<Arc<WebhookGateway>>) -> Json<HealthResponse> {
    let resolver = gateway.responder().resolver();
    Json(HealthResponse {
        status: "ok",
        model: resolver.model_name().to_string(),
        corpus_entries: resolver.corpus().len(),
        cached_embeddings: resolver.cached_embeddings(),
    })
}
