use super::{parser, NewsArticle, NewsSearchProvider};
use crate::providers::ProviderError;
use crate::sanitize::{strict_query, SanitizeError};

/// Maximum number of articles returned per search
pub const MAX_ARTICLES: usize = 5;

/// Errors from a news search, with stable user-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("News provider is not configured")]
    ProviderUnconfigured,

    #[error(transparent)]
    Query(#[from] SanitizeError),

    #[error("No response from provider")]
    EmptyProviderResponse,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Model not available")]
    ModelNotAvailable,

    #[error("News search failed")]
    Provider,
}

impl From<ProviderError> for NewsError {
    fn from(err: ProviderError) -> Self {
        if matches!(err, ProviderError::Unconfigured) {
            return NewsError::ProviderUnconfigured;
        }

        // only the provider's own error body can name the model
        let model_message = matches!(
            &err,
            ProviderError::Status { message, .. } if message.to_lowercase().contains("model")
        );

        match err.status() {
            Some(401) => NewsError::InvalidApiKey,
            Some(429) => NewsError::RateLimitExceeded,
            Some(404) => NewsError::ModelNotAvailable,
            _ if model_message => NewsError::ModelNotAvailable,
            _ => {
                log::error!("news provider failure: {err}");
                NewsError::Provider
            }
        }
    }
}

/// Result of a news search, with the query as it was sent.
#[derive(Debug, Clone)]
pub struct NewsSearch {
    pub query: String,
    pub articles: Vec<NewsArticle>,
}

pub struct NewsAggregator {
    provider: Box<dyn NewsSearchProvider>,
}

impl NewsAggregator {
    pub fn new(provider: Box<dyn NewsSearchProvider>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    /// Search recent news about `query`.
    ///
    /// A response that cannot be parsed is not an error and yields no
    /// articles.
    pub fn search_news(&self, query: &str) -> Result<NewsSearch, NewsError> {
        if !self.provider.is_configured() {
            return Err(NewsError::ProviderUnconfigured);
        }

        let query = strict_query(query)?;

        log::debug!("{}: searching news for {query:?}", self.provider.name());
        let text = self
            .provider
            .search(&build_prompt(&query))?
            .ok_or(NewsError::EmptyProviderResponse)?;

        let mut articles = parser::extract_articles(&text);
        if articles.len() > MAX_ARTICLES {
            log::debug!("dropping {} extra articles", articles.len() - MAX_ARTICLES);
            articles.truncate(MAX_ARTICLES);
        }

        Ok(NewsSearch { query, articles })
    }
}

fn build_prompt(query: &str) -> String {
    format!(
        "Search the web for the most recent and relevant news about: \"{query}\".\n\
         Return up to {MAX_ARTICLES} articles as a JSON object of the form \
         {{\"articles\": [...]}}. Each article must have the fields \
         Title, Summary, Relevance (why it matters for the query), Category, \
         URL, PublishedDate (ISO 8601) and Source.\n\
         Respond with JSON only."
    )
}
