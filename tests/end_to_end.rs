/// Full path: file corpus, generation service and reply API behind mock servers
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{sign, text_event, TableEmbedder, CHANNEL_SECRET, SCENARIO_TOML};
use replybot::app::App;
use replybot::config::Config;
use replybot::corpus::{load_corpus, FileCorpusStore};
use replybot::gateway::{router, LineReplyClient, SignatureVerifier, WebhookGateway};
use replybot::server::Server;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn build_app(temp: &TempDir, generation_uri: &str) -> App {
    let corpus_path = temp.path().join("corpus.toml");
    std::fs::write(&corpus_path, SCENARIO_TOML).unwrap();

    let mut config = Config::default();
    config.corpus.source = "file".to_string();
    config.corpus.file = corpus_path.clone();
    config.generation.endpoint = format!("{}/api/generate", generation_uri);
    config.generation.instruction = String::new();

    let store = FileCorpusStore::new(corpus_path);
    let corpus = load_corpus(&store).await.unwrap();

    App::from_parts(
        &config,
        Box::new(store),
        Arc::new(TableEmbedder::default()),
        corpus,
    )
    .unwrap()
}

#[tokio::test]
async fn test_greeting_and_fallback_scenario() {
    let temp = TempDir::new().unwrap();
    let ollama = MockServer::start().await;
    let line = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "supachai/llama-3-typhoon-v1.5",
            "prompt": "Question: quantum entanglement explained\nAnswer:",
            "stream": false,
            "max_tokens": 60
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "supachai/llama-3-typhoon-v1.5",
            "response": "Particles that stay linked at a distance.",
            "done": true
        })))
        .expect(1)
        .mount(&ollama)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .and(header("authorization", "Bearer access-token"))
        .and(body_json(serde_json::json!({
            "replyToken": "token-1",
            "messages": [{ "type": "text", "text": "Hi there!" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&line)
        .await;

    Mock::given(method("POST"))
        .and(path("/v2/bot/message/reply"))
        .and(body_json(serde_json::json!({
            "replyToken": "token-2",
            "messages": [{
                "type": "text",
                "text": "Particles that stay linked at a distance.\n(answered by fallback model)"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&line)
        .await;

    let app = build_app(&temp, &ollama.uri()).await;
    let sender =
        LineReplyClient::new(&line.uri(), "access-token", Duration::from_secs(5)).unwrap();
    let gateway = Arc::new(WebhookGateway::new(
        SignatureVerifier::new(CHANNEL_SECRET).unwrap(),
        app.responder().clone(),
        Arc::new(sender),
    ));

    for (text, token) in [
        ("hello", "token-1"),
        ("quantum entanglement explained", "token-2"),
    ] {
        let body = text_event(text, token);
        let response = router(gateway.clone(), "/")
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("x-line-signature", sign(&body))
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_generation_outage_still_acknowledged() {
    let temp = TempDir::new().unwrap();
    let ollama = MockServer::start().await;
    let line = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
        .mount(&ollama)
        .await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&line)
        .await;

    let app = build_app(&temp, &ollama.uri()).await;
    let sender =
        LineReplyClient::new(&line.uri(), "access-token", Duration::from_secs(5)).unwrap();
    let gateway = Arc::new(WebhookGateway::new(
        SignatureVerifier::new(CHANNEL_SECRET).unwrap(),
        app.responder().clone(),
        Arc::new(sender),
    ));

    let body = text_event("quantum entanglement explained", "token-2");
    let response = router(gateway, "/")
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("x-line-signature", sign(&body))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_server_gateway_reads_credentials_from_env() {
    let temp = TempDir::new().unwrap();
    let app = build_app(&temp, "http://127.0.0.1:9").await;

    let mut config = Config::default();
    config.line.channel_secret_env = "E2E_TEST_LINE_SECRET".to_string();
    config.line.access_token_env = "E2E_TEST_LINE_TOKEN".to_string();

    let server = Server::new(config, app);
    assert!(server.gateway().is_err());

    std::env::set_var("E2E_TEST_LINE_SECRET", "secret");
    std::env::set_var("E2E_TEST_LINE_TOKEN", "token");
    assert!(server.gateway().is_ok());
}
