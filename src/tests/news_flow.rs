//! News search through the chat-completions client and the history store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use crate::news::{NewsAggregator, NewsError};
use crate::providers::{OpenAiEmbeddings, OpenAiNewsSearch};
use crate::search::{SearchError, SearchService};
use crate::semantic::{EmbeddingClient, RankOptions};
use crate::store::{BackendCsv, SearchKind, SearchStore};

fn service(server: &mockito::Server, tmp: &tempfile::TempDir) -> (SearchService, Arc<BackendCsv>) {
    let store = Arc::new(BackendCsv::load(tmp.path()).unwrap());
    let embeddings = OpenAiEmbeddings::new(&server.url(), "text-embedding-3-small", None, Duration::from_secs(5))
        .unwrap();
    let news = OpenAiNewsSearch::new(
        &server.url(),
        "gpt-4o-search-preview",
        Some("sk-test".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();

    let svc = SearchService::new(
        EmbeddingClient::new(Box::new(embeddings)),
        NewsAggregator::new(Box::new(news)),
        store.clone(),
        RankOptions::default(),
    );
    (svc, store)
}

fn completion(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
}

#[test]
fn test_fenced_answer_is_normalized_and_recorded() {
    let mut server = mockito::Server::new();
    let tmp = tempfile::tempdir().unwrap();
    let (svc, store) = service(&server, &tmp);

    let answer = format!(
        "Sure! Here are the latest stories:\n```json\n{}\n```",
        json!({ "articles": [
            { "Title": "Rust 2027 edition announced", "Summary": "<script>x()</script>New edition", "URL": "https://blog.rust-lang.org", "Source": "Rust Blog" },
            { "title": "t".repeat(300), "category": "Tech" },
            "not an article",
        ]})
    );
    let _m = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion(&answer))
        .create();

    let resp = svc.search_news("alice", "rust editions").unwrap();
    assert_eq!(resp.count, 2);

    let first = &resp.results[0];
    assert_eq!(first.title, "Rust 2027 edition announced");
    assert_eq!(first.summary, "New edition");
    assert_eq!(first.url.as_deref(), Some("https://blog.rust-lang.org"));
    assert_eq!(first.category, "World");

    let second = &resp.results[1];
    assert!(second.title.ends_with("..."));
    assert!(second.title.chars().count() <= 203);
    assert_eq!(second.summary, "No summary available");
    assert_eq!(second.source, "Unknown");

    let history = store.history("alice", 1).unwrap();
    assert_eq!(history[0].kind, SearchKind::News);
    assert_eq!(history[0].query, "rust editions");
    assert_eq!(history[0].results[0]["title"], "Rust 2027 edition announced");
}

#[test]
fn test_prose_answer_yields_no_articles() {
    let mut server = mockito::Server::new();
    let tmp = tempfile::tempdir().unwrap();
    let (svc, _store) = service(&server, &tmp);

    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(completion("I could not find any recent news on that topic."))
        .create();

    let resp = svc.search_news("alice", "obscure topic").unwrap();
    assert_eq!(resp.count, 0);
    assert!(resp.results.is_empty());
}

#[test]
fn test_unknown_model() {
    let mut server = mockito::Server::new();
    let tmp = tempfile::tempdir().unwrap();
    let (svc, store) = service(&server, &tmp);

    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(404)
        .with_body(r#"{"error":{"message":"The model `gpt-4o-search-preview` does not exist"}}"#)
        .create();

    let err = svc.search_news("alice", "rust").unwrap_err();
    assert!(matches!(err, SearchError::News(NewsError::ModelNotAvailable)));
    assert_eq!(err.to_string(), "Model not available");
    assert!(store.history("alice", 1).unwrap().is_empty());
}

#[test]
fn test_null_content() {
    let mut server = mockito::Server::new();
    let tmp = tempfile::tempdir().unwrap();
    let (svc, _store) = service(&server, &tmp);

    let _m = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(json!({ "choices": [{ "message": { "content": null } }] }).to_string())
        .create();

    let err = svc.search_news("alice", "rust").unwrap_err();
    assert!(matches!(err, SearchError::News(NewsError::EmptyProviderResponse)));
}
