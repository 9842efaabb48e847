// Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use replybot::corpus::Corpus;
use replybot::embedding::{EmbeddingError, EmbeddingProvider};
use replybot::gateway::{DeliveryError, ReplySender, SignatureVerifier, WebhookGateway};
use replybot::generation::{GenerationError, Generator, PromptTemplate};
use replybot::resolver::{ResolverSettings, SimilarityResolver};
use replybot::responder::Responder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const CHANNEL_SECRET: &[u8] = b"test-channel-secret";

/// Deterministic embedder: known phrases get their own axis, anything else
/// lands on a third axis orthogonal to both
#[derive(Default)]
pub struct TableEmbedder {
    calls: AtomicUsize,
}

impl TableEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for TableEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match text {
            "hello" | "hello there" => vec![1.0, 0.0, 0.0],
            "what time is it" => vec![0.0, 1.0, 0.0],
            "good night" => vec![0.5, 0.0, 0.85],
            _ => vec![0.0, 0.0, 1.0],
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    fn dimension(&self) -> usize {
        3
    }

    fn model_name(&self) -> &str {
        "table"
    }
}

#[derive(Default)]
pub struct RecordingGenerator {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("generated".to_string())
    }
}

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ReplySender for RecordingSender {
    async fn send_reply(&self, reply_token: &str, text: &str) -> Result<(), DeliveryError> {
        self.sent
            .lock()
            .unwrap()
            .push((reply_token.to_string(), text.to_string()));
        Ok(())
    }
}

pub struct FailingSender;

#[async_trait]
impl ReplySender for FailingSender {
    async fn send_reply(&self, _reply_token: &str, _text: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::Status {
            status: 400,
            body: "Invalid reply token".to_string(),
        })
    }
}

/// `hello -> Hi there!` greeting plus `what time is it -> I don't know` question
pub fn scenario_corpus() -> Corpus {
    Corpus::new(
        vec![("hello".to_string(), "Hi there!".to_string())],
        vec![("what time is it".to_string(), "I don't know".to_string())],
    )
}

pub const SCENARIO_TOML: &str = r#"
[[greeting]]
phrase = "hello"
reply = "Hi there!"

[[question]]
question = "what time is it"
answer = "I don't know"
"#;

pub struct Harness {
    pub embedder: Arc<TableEmbedder>,
    pub generator: Arc<RecordingGenerator>,
    pub sender: Arc<RecordingSender>,
    pub gateway: Arc<WebhookGateway>,
}

pub fn harness() -> Harness {
    let embedder = Arc::new(TableEmbedder::default());
    let generator = Arc::new(RecordingGenerator::default());
    let sender = Arc::new(RecordingSender::default());

    let resolver = Arc::new(SimilarityResolver::new(
        embedder.clone(),
        scenario_corpus(),
        ResolverSettings::default(),
    ));
    let responder = Arc::new(Responder::new(
        resolver,
        generator.clone(),
        PromptTemplate::default(),
    ));
    let gateway = Arc::new(WebhookGateway::new(
        SignatureVerifier::new(CHANNEL_SECRET).unwrap(),
        responder,
        sender.clone(),
    ));

    Harness {
        embedder,
        generator,
        sender,
        gateway,
    }
}

pub fn text_event(text: &str, reply_token: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "destination": "Ubot",
        "events": [{
            "type": "message",
            "replyToken": reply_token,
            "source": { "type": "user", "userId": "U1" },
            "message": { "type": "text", "id": "1", "text": text }
        }]
    }))
    .unwrap()
}

pub fn sign(body: &[u8]) -> String {
    SignatureVerifier::new(CHANNEL_SECRET).unwrap().sign(body)
}
