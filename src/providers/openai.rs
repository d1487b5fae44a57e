use crate::news::NewsSearchProvider;
use crate::providers::{http_client, read_json, ProviderError};
use crate::semantic::EmbeddingProvider;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const NEWS_SYSTEM_PROMPT: &str = "You are a news research assistant with web access. \
Answer only with valid JSON, without markdown fences or commentary.";

fn non_empty_key(api_key: Option<String>) -> Option<String> {
    api_key.filter(|key| !key.trim().is_empty())
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{path}", base_url.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedding provider speaking the OpenAI `/embeddings` API.
pub struct OpenAiEmbeddings {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiEmbeddings {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: non_empty_key(api_key),
        })
    }
}

impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &'static str {
        "openai-embeddings"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn embed(&self, input: &str) -> Result<Vec<f32>, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::Unconfigured)?;

        let request = EmbeddingRequest {
            model: &self.model,
            input,
            encoding_format: "float",
        };

        let resp = self
            .client
            .post(endpoint(&self.base_url, "embeddings"))
            .bearer_auth(api_key)
            .json(&request)
            .send()?;

        let body = read_json(resp, self.name())?;
        let parsed: EmbeddingResponse = serde_json::from_value(body)
            .map_err(|err| ProviderError::InvalidResponse(err.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::InvalidResponse("no embedding returned".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// AI web-search provider speaking the OpenAI `/chat/completions` API.
///
/// Meant for search-enabled models (e.g. `gpt-4o-search-preview`), which
/// browse before answering.
pub struct OpenAiNewsSearch {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiNewsSearch {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: non_empty_key(api_key),
        })
    }

    fn extract_text(body: &Value) -> Option<String> {
        let content = body
            .get("choices")?
            .get(0)?
            .get("message")?
            .get("content")?
            .as_str()?;

        if content.trim().is_empty() {
            None
        } else {
            Some(content.to_string())
        }
    }
}

impl NewsSearchProvider for OpenAiNewsSearch {
    fn name(&self) -> &'static str {
        "openai-news"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn search(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let api_key = self.api_key.as_ref().ok_or(ProviderError::Unconfigured)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: NEWS_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let resp = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()?;

        let body = read_json(resp, self.name())?;
        Ok(Self::extract_text(&body))
    }
}
