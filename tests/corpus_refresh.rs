/// Corpus snapshots loaded from a TOML file and swapped on refresh
mod common;

use common::{TableEmbedder, SCENARIO_TOML};
use pretty_assertions::assert_eq;
use replybot::app::App;
use replybot::config::Config;
use replybot::corpus::{
    load_corpus, Category, CorpusFile, FileCorpusStore, GreetingRow, QuestionRow,
};
use replybot::resolver::{ReplySource, ResolvedReply};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn app_for(path: &Path, corpus: replybot::corpus::Corpus) -> App {
    App::from_parts(
        &Config::default(),
        Box::new(FileCorpusStore::new(path.to_path_buf())),
        Arc::new(TableEmbedder::default()),
        corpus,
    )
    .unwrap()
}

#[tokio::test]
async fn test_loading_twice_is_identical() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("corpus.toml");
    std::fs::write(&path, SCENARIO_TOML).unwrap();

    let store = FileCorpusStore::new(path);
    let first = load_corpus(&store).await.unwrap();
    let second = load_corpus(&store).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.count(Category::Greeting), 1);
    assert_eq!(first.count(Category::Question), 1);
}

#[tokio::test]
async fn test_refresh_picks_up_new_phrases() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("corpus.toml");
    std::fs::write(&path, SCENARIO_TOML).unwrap();

    let corpus = load_corpus(&FileCorpusStore::new(path.clone()))
        .await
        .unwrap();
    let app = app_for(&path, corpus);

    let before = app.resolver().resolve("good night").await.unwrap();
    assert_eq!(before.source(), ReplySource::Fallback);
    assert!(app.resolver().cached_embeddings() > 0);

    let updated = format!(
        "{}\n[[greeting]]\nphrase = \"good night\"\nreply = \"Sleep well!\"\n",
        SCENARIO_TOML
    );
    std::fs::write(&path, updated).unwrap();

    assert_eq!(app.refresh_corpus().await.unwrap(), 3);
    assert_eq!(app.resolver().cached_embeddings(), 0);

    match app.resolver().resolve("good night").await.unwrap() {
        ResolvedReply::Corpus {
            reply, category, ..
        } => {
            assert_eq!(reply, "Sleep well!");
            assert_eq!(category, Category::Greeting);
        }
        other => panic!("expected a corpus reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_refresh_keeps_snapshot() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("corpus.toml");
    std::fs::write(&path, SCENARIO_TOML).unwrap();

    let corpus = load_corpus(&FileCorpusStore::new(path.clone()))
        .await
        .unwrap();
    let app = app_for(&path, corpus);

    std::fs::write(&path, "[[greeting]]\nphrase = ").unwrap();
    assert!(app.refresh_corpus().await.is_err());

    std::fs::remove_file(&path).unwrap();
    assert!(app.refresh_corpus().await.is_err());

    assert_eq!(app.resolver().corpus().len(), 2);
    let resolved = app.resolver().resolve("hello").await.unwrap();
    assert_eq!(resolved.source(), ReplySource::Corpus);
}

#[tokio::test]
async fn test_written_corpus_file_loads_back() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("corpus.toml");

    let file = CorpusFile {
        greeting: vec![GreetingRow {
            phrase: "good morning".to_string(),
            reply: "Morning!".to_string(),
        }],
        question: vec![QuestionRow {
            question: "what are your opening hours".to_string(),
            answer: "9 to 5".to_string(),
        }],
    };
    std::fs::write(&path, toml::to_string_pretty(&file).unwrap()).unwrap();

    let corpus = load_corpus(&FileCorpusStore::new(path)).await.unwrap();
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.entries()[0].reply, "Morning!");
    assert_eq!(corpus.entries()[1].category, Category::Question);
}
