//! Linear-scan similarity ranking over a pre-fetched candidate batch.

use serde::Serialize;
use serde_json::{Map, Value};

use super::vector::{cosine_similarity, EmbeddingVector};

/// Default minimum similarity for a candidate to be returned.
pub const DEFAULT_THRESHOLD: f32 = 0.7;

/// Default maximum number of ranked results.
pub const DEFAULT_LIMIT: usize = 10;

/// An entity eligible for ranking.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: String,
    /// Original attributes of the entity, returned untouched apart from the score
    pub payload: Value,
    pub embedding: Option<EmbeddingVector>,
}

/// A candidate that passed the threshold, with its score.
#[derive(Debug, Clone, Serialize)]
pub struct RankedResult {
    pub id: String,
    pub similarity: f32,
    /// Original payload with a `similarity` field merged in
    pub payload: Value,
}

#[derive(Debug, Clone, Copy)]
pub struct RankOptions {
    pub threshold: f32,
    pub limit: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Rank candidates by cosine similarity to `query`.
///
/// Candidates without an embedding, or whose embedding length differs from
/// the query, are skipped. Results are sorted by score descending; the sort is
/// stable so equal scores keep their input order.
pub fn rank(query: &[f32], candidates: Vec<Candidate>, opts: RankOptions) -> Vec<RankedResult> {
    let total = candidates.len();
    let mut skipped = 0usize;

    let mut results: Vec<RankedResult> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let Some(embedding) = candidate.embedding.as_ref() else {
                skipped += 1;
                return None;
            };

            let similarity = match cosine_similarity(query, embedding.as_slice()) {
                Ok(score) => score,
                Err(err) => {
                    log::debug!("skipping candidate {}: {err}", candidate.id);
                    skipped += 1;
                    return None;
                }
            };

            if similarity >= opts.threshold {
                Some(RankedResult {
                    payload: merge_similarity(candidate.payload, similarity),
                    id: candidate.id,
                    similarity,
                })
            } else {
                None
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(opts.limit);

    log::debug!(
        "ranked {total} candidates: {} results, {skipped} skipped",
        results.len()
    );

    results
}

fn merge_similarity(payload: Value, similarity: f32) -> Value {
    let mut object = match payload {
        Value::Object(object) => object,
        Value::Null => Map::new(),
        other => {
            let mut object = Map::new();
            object.insert("data".to_string(), other);
            object
        }
    };
    object.insert("similarity".to_string(), Value::from(similarity));
    Value::Object(object)
}
