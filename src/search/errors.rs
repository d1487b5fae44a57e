use crate::news::NewsError;
use crate::sanitize::SanitizeError;
use crate::semantic::{EmbeddingError, VectorError};

/// Errors surfaced by the search entry points.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Query(#[from] SanitizeError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    News(#[from] NewsError),

    #[error(transparent)]
    Vector(#[from] VectorError),

    #[error("Storage error: {0}")]
    Store(#[from] anyhow::Error),
}

impl SearchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SearchError::InvalidInput(msg.into())
    }
}
