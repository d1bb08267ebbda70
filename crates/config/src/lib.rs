//! Configuration loading, validation, and management for judgebot.
//!
//! Loads configuration from `~/.judgebot/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.judgebot/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Max tokens per model response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Agent loop settings
    #[serde(default)]
    pub agent: AgentConfig,

    /// Rules corpus and retrieval index settings
    #[serde(default)]
    pub rules: RulesConfig,

    /// Card and combo database endpoints
    #[serde(default)]
    pub apis: ApiConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "anthropic".into()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("agent", &self.agent)
            .field("rules", &self.rules)
            .field("apis", &self.apis)
            .field("logging", &self.logging)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model calls allowed per question before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Run the tool calls of one model turn concurrently
    #[serde(default)]
    pub parallel_tools: bool,

    /// Upper bound on a single tool call, on top of the HTTP timeouts
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Replace the built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,
}

fn default_max_iterations() -> u32 {
    5
}
fn default_tool_timeout_secs() -> u64 {
    45
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            parallel_tools: false,
            tool_timeout_secs: default_tool_timeout_secs(),
            system_prompt_override: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Where the persisted collection lives (default: `~/.judgebot/rules`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Collection name; the file is `<data_dir>/<collection>.jsonl`
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Where `judgebot ingest` downloads the Comprehensive Rules from
    #[serde(default = "default_source_url")]
    pub source_url: String,

    /// Local copy used when the download fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_file: Option<PathBuf>,

    /// Rules whose collapsed text is shorter than this are dropped
    #[serde(default = "default_min_rule_length")]
    pub min_rule_length: usize,

    /// Chunks embedded and written per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_collection() -> String {
    "mtg_comprehensive_rules".into()
}
fn default_source_url() -> String {
    "https://media.wizards.com/2025/downloads/MagicCompRules%2020251114.txt".into()
}
fn default_min_rule_length() -> usize {
    20
}
fn default_batch_size() -> usize {
    100
}

impl RulesConfig {
    /// The resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("rules"))
    }

    /// Local fallback file (default: `<data_dir>/MagicCompRules.txt`).
    pub fn local_file(&self) -> PathBuf {
        self.local_file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("MagicCompRules.txt"))
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            collection: default_collection(),
            source_url: default_source_url(),
            local_file: None,
            min_rule_length: default_min_rule_length(),
            batch_size: default_batch_size(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

/// Which embedder builds and queries the rules index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// Offline feature hashing, no network or API key
    #[default]
    Hashing,
    /// A provider's embeddings endpoint
    Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Vector length for the hashing backend
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Provider used when `backend = "provider"`
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Embedding model used when `backend = "provider"`
    #[serde(default = "default_embedding_model")]
    pub model: String,
}

fn default_dimensions() -> usize {
    384
}
fn default_embedding_provider() -> String {
    "openai".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            dimensions: default_dimensions(),
            provider: default_embedding_provider(),
            model: default_embedding_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_scryfall_url")]
    pub scryfall_url: String,

    #[serde(default = "default_spellbook_url")]
    pub spellbook_url: String,

    /// Sent on every outbound request; Scryfall rejects requests without one
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for GET lookups
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for POST analyses (decklists, brackets)
    #[serde(default = "default_post_timeout_secs")]
    pub post_timeout_secs: u64,

    /// Pause after each Scryfall request (their guidance is 50-100ms)
    #[serde(default = "default_scryfall_delay_ms")]
    pub scryfall_delay_ms: u64,
}

fn default_scryfall_url() -> String {
    "https://api.scryfall.com".into()
}
fn default_spellbook_url() -> String {
    "https://backend.commanderspellbook.com".into()
}
fn default_user_agent() -> String {
    concat!("judgebot/", env!("CARGO_PKG_VERSION")).into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_post_timeout_secs() -> u64 {
    60
}
fn default_scryfall_delay_ms() -> u64 {
    100
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            scryfall_url: default_scryfall_url(),
            spellbook_url: default_spellbook_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            post_timeout_secs: default_post_timeout_secs(),
            scryfall_delay_ms: default_scryfall_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the default path (~/.judgebot/config.toml).
    ///
    /// Environment variables override the file:
    /// - `JUDGEBOT_API_KEY` (highest priority), then `ANTHROPIC_API_KEY`
    /// - `JUDGEBOT_PROVIDER`, `JUDGEBOT_MODEL`
    /// - `JUDGEBOT_DATA_DIR`, `JUDGEBOT_RULES_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("JUDGEBOT_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = lookup("ANTHROPIC_API_KEY");
        }

        if let Some(provider) = lookup("JUDGEBOT_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("JUDGEBOT_MODEL") {
            self.default_model = model;
        }
        if let Some(dir) = lookup("JUDGEBOT_DATA_DIR") {
            self.rules.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup("JUDGEBOT_RULES_URL") {
            self.rules.source_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".judgebot")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "default_max_tokens must be > 0".into(),
            ));
        }
        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }
        if self.rules.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "rules.batch_size must be at least 1".into(),
            ));
        }
        if self.rules.collection.trim().is_empty()
            || self.rules.collection.contains(['/', '\\'])
        {
            return Err(ConfigError::ValidationError(
                "rules.collection must be a plain, non-empty name".into(),
            ));
        }
        if self.rules.embedding.dimensions < 8 {
            return Err(ConfigError::ValidationError(
                "rules.embedding.dimensions must be at least 8".into(),
            ));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            agent: AgentConfig::default(),
            rules: RulesConfig::default(),
            apis: ApiConfig::default(),
            logging: LoggingConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {}: {reason}", .path.display())]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {}: {reason}", .path.display())]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
