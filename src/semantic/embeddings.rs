//! Embedding generation on top of an external provider.
//!
//! - Input cleanup and length capping
//! - Credential check before any network call
//! - Provider failures wrapped into a single `EmbeddingFailed` kind

use crate::providers::ProviderError;
use crate::semantic::preprocess::{post_input, prepare_input, user_input};
use crate::semantic::vector::EmbeddingVector;

/// A service that turns text into an embedding vector.
pub trait EmbeddingProvider: Send + Sync {
    /// Name of the provider for logging
    fn name(&self) -> &'static str;

    /// Whether an API credential is available
    fn is_configured(&self) -> bool;

    /// Embed a single, already prepared input
    fn embed(&self, input: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Text to embed cannot be empty")]
    InvalidInput,

    #[error("Embedding provider is not configured")]
    ProviderUnconfigured,

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),
}

/// Client generating embeddings through an injected provider.
pub struct EmbeddingClient {
    provider: Box<dyn EmbeddingProvider>,
}

impl EmbeddingClient {
    pub fn new(provider: Box<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Generate an embedding for arbitrary text.
    ///
    /// Text is trimmed and silently truncated to the provider input cap. The
    /// provider is called exactly once; there is no retry.
    pub fn generate(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let input = prepare_input(text).ok_or(EmbeddingError::InvalidInput)?;

        if !self.provider.is_configured() {
            return Err(EmbeddingError::ProviderUnconfigured);
        }

        let values = self.provider.embed(&input).map_err(|err| {
            log::warn!("{}: embedding failed: {err}", self.provider.name());
            EmbeddingError::EmbeddingFailed(err.to_string())
        })?;

        if values.is_empty() {
            return Err(EmbeddingError::EmbeddingFailed(
                "provider returned an empty vector".to_string(),
            ));
        }

        Ok(EmbeddingVector::from(values))
    }

    /// Embedding for a post, biased toward its author.
    pub fn generate_for_post(
        &self,
        username: &str,
        content: &str,
    ) -> Result<EmbeddingVector, EmbeddingError> {
        self.generate(&post_input(username, content))
    }

    /// Embedding for a user profile.
    pub fn generate_for_user(
        &self,
        username: &str,
        email: &str,
    ) -> Result<EmbeddingVector, EmbeddingError> {
        self.generate(&user_input(username, email))
    }
}
