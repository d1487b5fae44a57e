//! AI news aggregation.
//!
//! - `parser`: tolerant article extraction from provider text
//! - `aggregator`: query sanitization, provider call and error mapping

mod aggregator;
mod parser;

pub use aggregator::{NewsAggregator, NewsError};

use crate::providers::ProviderError;
use serde::{Deserialize, Serialize};

/// An external AI capability that searches the web and answers in text.
pub trait NewsSearchProvider: Send + Sync {
    /// Name of the provider for logging
    fn name(&self) -> &'static str;

    /// Whether an API credential is available
    fn is_configured(&self) -> bool;

    /// Run one search instruction. `Ok(None)` means the provider answered
    /// without any text.
    fn search(&self, prompt: &str) -> Result<Option<String>, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub summary: String,
    pub relevance: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub published_date: String,
    pub source: String,
}
