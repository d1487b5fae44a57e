//! Entity indexing and search over the real OpenAI-compatible client,
//! against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use mockito::Matcher;
use serde_json::json;

use crate::news::NewsAggregator;
use crate::providers::{OpenAiEmbeddings, OpenAiNewsSearch};
use crate::search::{EntitySearchRequest, SearchError, SearchService};
use crate::semantic::{EmbeddingClient, EmbeddingError, RankOptions};
use crate::store::{BackendCsv, EntityKind, SearchKind, SearchStore};

fn service(server: &mockito::Server, store: Arc<BackendCsv>) -> SearchService {
    let embeddings = OpenAiEmbeddings::new(
        &server.url(),
        "text-embedding-3-small",
        Some("sk-test".to_string()),
        Duration::from_secs(5),
    )
    .unwrap();
    let news = OpenAiNewsSearch::new(&server.url(), "gpt-4o-search-preview", None, Duration::from_secs(5))
        .unwrap();

    SearchService::new(
        EmbeddingClient::new(Box::new(embeddings)),
        NewsAggregator::new(Box::new(news)),
        store,
        RankOptions::default(),
    )
}

fn mock_embedding(server: &mut mockito::Server, input: &str, vector: &[f32]) -> mockito::Mock {
    server
        .mock("POST", "/embeddings")
        .match_body(Matcher::PartialJson(json!({ "input": input })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "data": [{ "embedding": vector }] }).to_string())
        .create()
}

fn search(kind: EntityKind, query: &str) -> EntitySearchRequest {
    EntitySearchRequest {
        kind,
        query: query.to_string(),
        limit: None,
        threshold: None,
    }
}

#[test]
fn test_posts_ranked_by_similarity() {
    let mut server = mockito::Server::new();
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(BackendCsv::load(tmp.path()).unwrap());
    let svc = service(&server, store.clone());

    let _tom = mock_embedding(&mut server, "Author: tom\nContent: cats are great", &[1.0, 0.0]);
    let _ann = mock_embedding(&mut server, "Author: ann\nContent: kittens", &[0.9, 0.1]);
    let _joe = mock_embedding(&mut server, "Author: joe\nContent: tax law", &[0.0, 1.0]);
    let _query = mock_embedding(&mut server, "cats", &[1.0, 0.0]);

    svc.save_post("tom", "cats are great", Some("p1".into())).unwrap();
    svc.save_post("ann", "kittens", Some("p2".into())).unwrap();
    svc.save_post("joe", "tax law", Some("p3".into())).unwrap();

    let resp = svc.search_entities("alice", search(EntityKind::Post, "cats")).unwrap();
    let ids: Vec<&str> = resp.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);
    assert!((resp.results[0].similarity - 1.0).abs() < 1e-6);
    assert_eq!(resp.results[1].payload["similarity"], json!(resp.results[1].similarity));

    let history = store.history("alice", 10).unwrap();
    assert_eq!(history[0].kind, SearchKind::Posts);
    assert_eq!(history[0].results.as_array().unwrap().len(), 2);
}

#[test]
fn test_provider_outage_keeps_entity() {
    let mut server = mockito::Server::new();
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(BackendCsv::load(tmp.path()).unwrap());
    let svc = service(&server, store.clone());

    let _down = server
        .mock("POST", "/embeddings")
        .with_status(503)
        .with_body(r#"{"error":{"message":"overloaded"}}"#)
        .create();

    let saved = svc.save_user("bob", "bob@example.com", Some("u1".into())).unwrap();
    assert!(!saved.embedded);

    // reload from disk: the user exists but is not a search candidate
    let reloaded = BackendCsv::load(tmp.path()).unwrap();
    assert!(reloaded.candidates(EntityKind::User, 10).unwrap().is_empty());

    let err = svc
        .search_entities("alice", search(EntityKind::User, "bob"))
        .unwrap_err();
    match err {
        SearchError::Embedding(EmbeddingError::EmbeddingFailed(msg)) => {
            assert!(msg.contains("overloaded"))
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(store.history("alice", 10).unwrap().is_empty());
}

#[test]
fn test_stale_dimension_is_skipped() {
    let mut server = mockito::Server::new();
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(BackendCsv::load(tmp.path()).unwrap());
    let svc = service(&server, store);

    // indexed with an older three dimensional model
    let _old = mock_embedding(&mut server, "Username: old\nEmail: old@example.com", &[1.0, 0.0, 0.0]);
    let _new = mock_embedding(&mut server, "Username: new\nEmail: new@example.com", &[1.0, 0.0]);
    let _query = mock_embedding(&mut server, "someone", &[1.0, 0.0]);

    svc.save_user("old", "old@example.com", Some("u-old".into())).unwrap();
    svc.save_user("new", "new@example.com", Some("u-new".into())).unwrap();

    let resp = svc
        .search_entities("alice", search(EntityKind::User, "someone"))
        .unwrap();
    assert_eq!(resp.count, 1);
    assert_eq!(resp.results[0].id, "u-new");
}
