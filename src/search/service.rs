use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::SearchError;
use crate::eid::Eid;
use crate::news::{NewsAggregator, NewsArticle};
use crate::sanitize::strict_query;
use crate::semantic::{cosine_similarity, rank, EmbeddingClient, RankOptions, RankedResult};
use crate::store::{Entity, EntityKind, SearchHistoryEntry, SearchKind, SearchStore};

/// Maximum number of stored entities scored per search
pub const CANDIDATE_BATCH: usize = 100;

/// Search results together with the normalized query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse<T> {
    pub query: String,
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> SearchResponse<T> {
    fn new(query: String, results: Vec<T>) -> Self {
        Self {
            query,
            count: results.len(),
            results,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitySearchRequest {
    pub kind: EntityKind,
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub threshold: Option<f32>,
}

/// Outcome of indexing a post or user.
#[derive(Debug, Clone, Serialize)]
pub struct SavedEntity {
    pub id: String,
    pub kind: EntityKind,
    /// False when the embedding provider failed; the entity is stored but
    /// cannot be found by search until it is saved again.
    pub embedded: bool,
}

pub struct SearchService {
    embeddings: EmbeddingClient,
    news: NewsAggregator,
    store: Arc<dyn SearchStore>,
    defaults: RankOptions,
}

fn require(field: &str, value: &str) -> Result<String, SearchError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(SearchError::invalid(format!("{field} cannot be empty")));
    }
    Ok(value.to_string())
}

impl SearchService {
    pub fn new(
        embeddings: EmbeddingClient,
        news: NewsAggregator,
        store: Arc<dyn SearchStore>,
        defaults: RankOptions,
    ) -> Self {
        Self {
            embeddings,
            news,
            store,
            defaults,
        }
    }

    /// Semantic search over stored posts or users.
    pub fn search_entities(
        &self,
        user_id: &str,
        req: EntitySearchRequest,
    ) -> Result<SearchResponse<RankedResult>, SearchError> {
        require("Query", &req.query)?;
        let query = strict_query(&req.query)?;

        let threshold = req.threshold.unwrap_or(self.defaults.threshold);
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SearchError::invalid(
                "Threshold must be between 0 and 1",
            ));
        }

        let limit = req.limit.unwrap_or(self.defaults.limit);
        if limit == 0 {
            return Err(SearchError::invalid("Limit must be greater than 0"));
        }
        // no more than one candidate batch can ever match
        let limit = limit.min(CANDIDATE_BATCH);

        let query_vector = self.embeddings.generate(&query)?;
        let candidates = self.store.candidates(req.kind, CANDIDATE_BATCH)?;
        let scanned = candidates.len();

        let results = rank(
            query_vector.as_slice(),
            candidates,
            RankOptions { threshold, limit },
        );

        log::debug!(
            "{} search {query:?}: {} of {scanned} candidates above {threshold}",
            req.kind,
            results.len()
        );

        let scores: Vec<Value> = results
            .iter()
            .map(|r| json!({ "id": r.id, "similarity": r.similarity }))
            .collect();
        self.record(user_id, req.kind.into(), &query, Value::Array(scores))?;

        Ok(SearchResponse::new(query, results))
    }

    /// AI news search. The echoed query is the sanitized one sent to the
    /// provider.
    pub fn search_news(
        &self,
        user_id: &str,
        query: &str,
    ) -> Result<SearchResponse<NewsArticle>, SearchError> {
        require("Query", query)?;

        let search = self.news.search_news(query)?;
        let results = serde_json::to_value(&search.articles).map_err(anyhow::Error::from)?;
        self.record(user_id, SearchKind::News, &search.query, results)?;

        Ok(SearchResponse::new(search.query, search.articles))
    }

    fn record(
        &self,
        user_id: &str,
        kind: SearchKind,
        query: &str,
        results: Value,
    ) -> Result<(), SearchError> {
        self.store.append_history(SearchHistoryEntry {
            id: Eid::new().into(),
            user_id: user_id.to_string(),
            kind,
            query: query.to_string(),
            results,
            created_at: Utc::now(),
        })?;
        Ok(())
    }

    pub fn save_post(
        &self,
        author: &str,
        content: &str,
        id: Option<String>,
    ) -> Result<SavedEntity, SearchError> {
        let author = require("Author", author)?;
        let content = require("Content", content)?;
        let id = id.unwrap_or_else(|| Eid::new().into());

        let embedding = self
            .embeddings
            .generate_for_post(&author, &content)
            .map_err(|err| log::warn!("post {id} saved without embedding: {err}"))
            .ok();

        let attributes = json!({ "id": id, "author": author, "content": content });
        self.save(id, EntityKind::Post, attributes, embedding)
    }

    pub fn save_user(
        &self,
        username: &str,
        email: &str,
        id: Option<String>,
    ) -> Result<SavedEntity, SearchError> {
        let username = require("Username", username)?;
        let email = email.trim().to_string();
        let id = id.unwrap_or_else(|| Eid::new().into());

        let embedding = self
            .embeddings
            .generate_for_user(&username, &email)
            .map_err(|err| log::warn!("user {id} saved without embedding: {err}"))
            .ok();

        let attributes = json!({ "id": id, "username": username, "email": email });
        self.save(id, EntityKind::User, attributes, embedding)
    }

    fn save(
        &self,
        id: String,
        kind: EntityKind,
        attributes: Value,
        embedding: Option<crate::semantic::EmbeddingVector>,
    ) -> Result<SavedEntity, SearchError> {
        let embedded = embedding.is_some();
        self.store.upsert(Entity {
            id: id.clone(),
            kind,
            attributes,
            embedding,
            updated_at: Utc::now(),
        })?;

        Ok(SavedEntity { id, kind, embedded })
    }

    /// Past searches of `user_id`, newest first.
    pub fn history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SearchHistoryEntry>, SearchError> {
        if limit == 0 {
            return Err(SearchError::invalid("Limit must be greater than 0"));
        }
        Ok(self.store.history(user_id, limit)?)
    }

    /// Cosine similarity between the embeddings of two texts.
    pub fn compare_texts(&self, a: &str, b: &str) -> Result<f32, SearchError> {
        let a = self.embeddings.generate(a)?;
        let b = self.embeddings.generate(b)?;
        Ok(cosine_similarity(a.as_slice(), b.as_slice())?)
    }
}
