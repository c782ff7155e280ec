use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6333";
const DEFAULT_COLLECTION: &str = "chroma_agents";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_LLM_MODEL: &str = "Fanar-S-1-7B";
const DEFAULT_EMBEDDING_MODEL: &str = "bge-m3";
const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;
const DEFAULT_CHUNK_SIZE: usize = 800;
const DEFAULT_CHUNK_OVERLAP: usize = 100;
const DEFAULT_TOP_K: usize = 5;
const DEFAULT_SESSION_ID: &str = "default";
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_SESSION_MAX: usize = 1024;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
const DEFAULT_UPLOAD_MAX_BYTES: usize = 20 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the chatbot server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// API key for the hosted chat-completions endpoint.
    pub llm_api_key: String,
    /// Base URL of the OpenAI-compatible chat API (e.g. `https://api.example.com/v1`).
    pub llm_base_url: String,
    /// Chat model identifier.
    pub llm_model: String,
    /// Sampling temperature passed to the chat model.
    pub llm_temperature: f32,
    /// Timeout applied to each chat-completion request.
    pub llm_timeout_secs: u64,
    /// Base URL of the Qdrant instance that stores embeddings.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for document storage.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Base URL for OpenAI-compatible embeddings (defaults to the chat base URL).
    pub embedding_base_url: Option<String>,
    /// API key for OpenAI-compatible embeddings (defaults to the chat API key).
    pub embedding_api_key: Option<String>,
    /// Timeout applied to Qdrant and embedding requests.
    pub http_timeout_secs: u64,
    /// Maximum characters per chunk.
    pub text_splitter_chunk_size: usize,
    /// Characters shared between adjacent chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Number of records retrieved for each chat turn.
    pub retrieval_top_k: usize,
    /// Session used when a chat request does not name one.
    pub default_session_id: String,
    /// Idle time after which a session history is evicted.
    pub session_ttl_secs: u64,
    /// Maximum number of live session histories.
    pub session_max_sessions: usize,
    /// Allowed CORS origins; `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    /// Maximum accepted request body for uploads.
    pub upload_max_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAI,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source(lookup);
        let config = Self {
            llm_api_key: source.required("LLM_API_KEY")?,
            llm_base_url: source.required("LLM_BASE_URL")?,
            llm_model: source.or("LLM_MODEL", DEFAULT_LLM_MODEL),
            llm_temperature: source.parsed("LLM_TEMPERATURE")?.unwrap_or(0.0),
            llm_timeout_secs: source
                .parsed("LLM_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS),
            qdrant_url: source.or("QDRANT_URL", DEFAULT_QDRANT_URL),
            qdrant_collection_name: source.or("QDRANT_COLLECTION_NAME", DEFAULT_COLLECTION),
            qdrant_api_key: source.optional("QDRANT_API_KEY"),
            embedding_provider: source
                .optional("EMBEDDING_PROVIDER")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".into()))
                })
                .transpose()?
                .unwrap_or(EmbeddingProvider::Ollama),
            embedding_model: source.or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension: source
                .parsed("EMBEDDING_DIMENSION")?
                .unwrap_or(DEFAULT_EMBEDDING_DIMENSION),
            ollama_url: source.or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            embedding_base_url: source.optional("EMBEDDING_BASE_URL"),
            embedding_api_key: source.optional("EMBEDDING_API_KEY"),
            http_timeout_secs: source
                .parsed("HTTP_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            text_splitter_chunk_size: source
                .parsed("TEXT_SPLITTER_CHUNK_SIZE")?
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            text_splitter_chunk_overlap: source
                .parsed("TEXT_SPLITTER_CHUNK_OVERLAP")?
                .unwrap_or(DEFAULT_CHUNK_OVERLAP),
            retrieval_top_k: source.parsed("RETRIEVAL_TOP_K")?.unwrap_or(DEFAULT_TOP_K),
            default_session_id: source.or("DEFAULT_SESSION_ID", DEFAULT_SESSION_ID),
            session_ttl_secs: source
                .parsed("SESSION_TTL_SECS")?
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            session_max_sessions: source
                .parsed("SESSION_MAX_SESSIONS")?
                .unwrap_or(DEFAULT_SESSION_MAX),
            cors_origins: source.optional("CORS_ORIGINS").map(|value| split_list(&value)),
            upload_max_bytes: source
                .parsed("UPLOAD_MAX_BYTES")?
                .unwrap_or(DEFAULT_UPLOAD_MAX_BYTES),
            server_port: source.parsed("SERVER_PORT")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        if self.text_splitter_chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        if self.text_splitter_chunk_overlap >= self.text_splitter_chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".into(),
            ));
        }
        if self.session_max_sessions == 0 {
            return Err(ConfigError::InvalidValue("SESSION_MAX_SESSIONS".into()));
        }
        Ok(())
    }

    /// Base URL used for OpenAI-compatible embedding requests.
    pub fn embedding_base_url(&self) -> &str {
        self.embedding_base_url
            .as_deref()
            .unwrap_or(&self.llm_base_url)
    }

    /// API key used for OpenAI-compatible embedding requests.
    pub fn embedding_api_key(&self) -> &str {
        self.embedding_api_key
            .as_deref()
            .unwrap_or(&self.llm_api_key)
    }
}

struct Source<F>(F);

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
    }

    fn or(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.optional(key)
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue(key.to_string()))
            })
            .transpose()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the process environment and install it in the global cache.
/// Later calls return the first loaded configuration. The binary loads `.env` beforehand.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        llm_model = %config.llm_model,
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "LLM_API_KEY" => Some("test-key".into()),
        "LLM_BASE_URL" => Some("http://127.0.0.1:9/v1".into()),
        "EMBEDDING_DIMENSION" => Some("4".into()),
        _ => None,
    })
    .expect("test config")
}
