//! Semantic search over stored posts and users.
//!
//! # Architecture
//!
//! - `vector`: cosine similarity and the embedding vector type
//! - `embeddings`: provider trait and the embedding client
//! - `preprocess`: text preparation for embedding input
//! - `ranker`: threshold/limit ranking over a candidate batch

pub mod embeddings;
mod preprocess;
pub mod ranker;
pub mod vector;

pub use embeddings::{EmbeddingClient, EmbeddingError, EmbeddingProvider};
pub use ranker::{rank, Candidate, RankOptions, RankedResult, DEFAULT_LIMIT, DEFAULT_THRESHOLD};
pub use vector::{cosine_similarity, EmbeddingVector, VectorError};
