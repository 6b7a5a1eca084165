use serde::Deserialize;

/// Main configuration structure for Kumo-Index
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// URLs every crawl starts from
    pub seeds: Vec<String>,

    /// Maximum number of distinct URLs a single crawl may admit
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Skip TLS certificate validation. Several seed sites serve
    /// self-signed or expired certificates.
    #[serde(rename = "accept-invalid-certs", default = "default_true")]
    pub accept_invalid_certs: bool,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,
}

impl UserAgentConfig {
    /// Header value sent on every request, e.g. `CrawlerBot/1.0`
    pub fn header_value(&self) -> String {
        format!("{}/{}", self.crawler_name, self.crawler_version)
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "CrawlerBot".to_string(),
            crawler_version: "1.0".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory where fetched PDFs are staged before parsing
    #[serde(rename = "download-dir", default = "default_download_dir")]
    pub download_dir: String,
}

/// Embedding service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedderConfig {
    /// Embedding model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Fixed output width of the model
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Input is truncated to this many characters before embedding
    #[serde(rename = "max-chars", default = "default_max_chars")]
    pub max_chars: usize,

    /// Request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_embed_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            dimensions: default_dimensions(),
            max_chars: default_max_chars(),
            timeout_secs: default_embed_timeout(),
        }
    }
}

/// Search result configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Number of results returned per query
    #[serde(rename = "top-k", default = "default_top_k")]
    pub top_k: usize,

    /// Maximum snippet length (characters)
    #[serde(rename = "snippet-chars", default = "default_snippet_chars")]
    pub snippet_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            snippet_chars: default_snippet_chars(),
        }
    }
}

fn default_max_pages() -> usize {
    120
}

fn default_workers() -> usize {
    6
}

fn default_request_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_download_dir() -> String {
    "downloads".to_string()
}

fn default_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_max_chars() -> usize {
    8000
}

fn default_embed_timeout() -> u64 {
    30
}

fn default_top_k() -> usize {
    5
}

fn default_snippet_chars() -> usize {
    300
}
