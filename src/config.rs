use anyhow::{bail, Context};
use homedir::my_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default embedding model, fixed per deployment
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_NEWS_MODEL: &str = "gpt-4o-search-preview";
const DEFAULT_EMBEDDING_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NEWS_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

const CONFIG_FILE: &str = "config.yaml";

/// Connection settings for the embedding provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Falls back to FEEDSCOUT_EMBEDDINGS_API_KEY or OPENAI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_embedding_model(),
            api_key: None,
            timeout_secs: DEFAULT_EMBEDDING_TIMEOUT_SECS,
        }
    }
}

/// Connection settings for the web-search capable chat model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_news_model")]
    pub model: String,

    /// Falls back to FEEDSCOUT_NEWS_API_KEY or OPENAI_API_KEY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_news_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_news_model(),
            api_key: None,
            timeout_secs: DEFAULT_NEWS_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Similarity threshold used when a request does not pass one
    #[serde(default = "default_threshold")]
    pub default_threshold: f32,

    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_threshold: crate::semantic::DEFAULT_THRESHOLD,
            default_limit: crate::semantic::DEFAULT_LIMIT,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_news_model() -> String {
    DEFAULT_NEWS_MODEL.to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    DEFAULT_EMBEDDING_TIMEOUT_SECS
}

fn default_news_timeout_secs() -> u64 {
    DEFAULT_NEWS_TIMEOUT_SECS
}

fn default_threshold() -> f32 {
    crate::semantic::DEFAULT_THRESHOLD
}

fn default_limit() -> usize {
    crate::semantic::DEFAULT_LIMIT
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embeddings: EmbeddingsConfig::default(),
            news: NewsConfig::default(),
            search: SearchConfig::default(),
            listen: default_listen(),
            base_path: PathBuf::new(),
        }
    }
}

/// Directory holding config and data files.
pub fn base_path() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var("FEEDSCOUT_BASE_PATH") {
        return Ok(PathBuf::from(path));
    }

    let home = my_home()?.context("could not determine home directory")?;
    Ok(home.join(".local/share/feedscout"))
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn validate_url(field: &str, value: &str) -> anyhow::Result<()> {
    url::Url::parse(value).with_context(|| format!("{field} is not a valid url: {value:?}"))?;
    Ok(())
}

impl Config {
    fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.search.default_threshold) {
            bail!(
                "search.default_threshold must be between 0.0 and 1.0, got {}",
                self.search.default_threshold
            );
        }

        if self.search.default_limit == 0 {
            bail!("search.default_limit must be greater than 0");
        }

        if self.embeddings.timeout_secs == 0 {
            bail!("embeddings.timeout_secs must be greater than 0");
        }

        if self.news.timeout_secs == 0 {
            bail!("news.timeout_secs must be greater than 0");
        }

        validate_url("embeddings.base_url", &self.embeddings.base_url)?;
        validate_url("news.base_url", &self.news.base_url)?;

        Ok(())
    }

    /// Fill credentials and listen address from the environment. Keys
    /// set in the file win.
    fn apply_env(&mut self) {
        let shared = env_key("OPENAI_API_KEY");

        if self.embeddings.api_key.is_none() {
            self.embeddings.api_key =
                env_key("FEEDSCOUT_EMBEDDINGS_API_KEY").or_else(|| shared.clone());
        }

        if self.news.api_key.is_none() {
            self.news.api_key = env_key("FEEDSCOUT_NEWS_API_KEY").or(shared);
        }

        if let Some(listen) = env_key("FEEDSCOUT_LISTEN") {
            self.listen = listen;
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(&base_path()?)
    }

    pub fn load_with(base_path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(base_path)?;
        let path = base_path.join(CONFIG_FILE);

        // create new if does not exist
        if !path.exists() {
            log::info!("writing default config to {}", path.display());
            std::fs::write(&path, serde_yml::to_string(&Self::default())?)?;
        }

        let config_str = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;
        config.base_path = base_path.to_path_buf();
        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        // keys from the environment are never written back to disk
        config.apply_env();

        Ok(config)
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_str = serde_yml::to_string(&self)?;
        std::fs::write(self.base_path.join(CONFIG_FILE), config_str)?;
        Ok(())
    }
}
