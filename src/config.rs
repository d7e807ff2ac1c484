//! TOML configuration.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a working setup: the local MiniLM embedder over
//! `focus_tips.json` with the index stored in `index_db/`.
//!
//! ```toml
//! [corpus]
//! path = "focus_tips.json"
//!
//! [index]
//! persist_dir = "index_db"
//!
//! [embedding]
//! provider = "local"        # local | openai | ollama | hashing
//! model = "all-minilm-l6-v2"
//!
//! [retrieval]
//! k = 5
//! fetch_k = 20
//! lambda_mult = 0.7
//!
//! [generation]
//! model = "Qwen/Qwen2.5-7B-Instruct"
//! max_new_tokens = 160
//!
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! After parsing, `FOCUSIA_PERSIST_DIR` and `HF_MODEL` override the index
//! directory and the generation model. Access tokens are never read from
//! the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use focusia_core::generate::{
    SamplingParams, DEFAULT_MAX_NEW_TOKENS, DEFAULT_REPETITION_PENALTY, DEFAULT_TEMPERATURE,
    DEFAULT_TOP_P,
};
use focusia_core::mmr::MmrParams;

/// Environment variable overriding `[index].persist_dir`.
pub const PERSIST_DIR_ENV: &str = "FOCUSIA_PERSIST_DIR";
/// Environment variable overriding `[generation].model`.
pub const MODEL_ENV: &str = "HF_MODEL";

pub const DEFAULT_CONFIG_PATH: &str = "config/focusia.toml";

/// Model used by the `local` provider when `[embedding].model` is unset.
pub const DEFAULT_LOCAL_MODEL: &str = "all-minilm-l6-v2";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
        }
    }
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("focus_tips.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            persist_dir: default_persist_dir(),
        }
    }
}

fn default_persist_dir() -> PathBuf {
    PathBuf::from("index_db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for the `ollama` provider.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout_secs(),
            url: None,
        }
    }
}

impl EmbeddingConfig {
    /// Configured model, with the `local` provider falling back to
    /// [`DEFAULT_LOCAL_MODEL`].
    pub fn resolved_model(&self) -> Option<&str> {
        match (self.model.as_deref(), self.provider.as_str()) {
            (Some(model), _) => Some(model),
            (None, "local") => Some(DEFAULT_LOCAL_MODEL),
            (None, _) => None,
        }
    }
}

fn default_provider() -> String {
    "local".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    0
}
fn default_embedding_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    #[serde(default = "default_lambda_mult")]
    pub lambda_mult: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            fetch_k: default_fetch_k(),
            lambda_mult: default_lambda_mult(),
        }
    }
}

impl RetrievalConfig {
    pub fn params(&self) -> MmrParams {
        MmrParams {
            k: self.k,
            fetch_k: self.fetch_k,
            lambda_mult: self.lambda_mult,
        }
    }
}

fn default_k() -> usize {
    5
}
fn default_fetch_k() -> usize {
    20
}
fn default_lambda_mult() -> f32 {
    0.7
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            repetition_penalty: default_repetition_penalty(),
            timeout_secs: default_generation_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            repetition_penalty: self.repetition_penalty,
        }
    }
}

fn default_endpoint() -> String {
    "https://api-inference.huggingface.co".to_string()
}
fn default_model() -> String {
    "Qwen/Qwen2.5-7B-Instruct".to_string()
}
fn default_max_new_tokens() -> u32 {
    DEFAULT_MAX_NEW_TOKENS
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_top_p() -> f32 {
    DEFAULT_TOP_P
}
fn default_repetition_penalty() -> f32 {
    DEFAULT_REPETITION_PENALTY
}
fn default_generation_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

impl Config {
    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(PERSIST_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            self.index.persist_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            self.generation.model = model;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.retrieval.params().validate()?;
        self.generation.sampling().validate()?;

        if self.generation.model.trim().is_empty() {
            bail!("generation.model must not be empty");
        }
        if self.generation.timeout_secs == 0 {
            bail!("generation.timeout_secs must be > 0");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        if self.embedding.dims == Some(0) {
            bail!("embedding.dims must be > 0");
        }

        match self.embedding.provider.as_str() {
            "hashing" | "local" => {}
            "openai" | "ollama" => {
                if self.embedding.dims.is_none() {
                    bail!(
                        "embedding.dims must be set when provider is '{}'",
                        self.embedding.provider
                    );
                }
                if self.embedding.model.is_none() {
                    bail!(
                        "embedding.model must be specified when provider is '{}'",
                        self.embedding.provider
                    );
                }
            }
            other => bail!(
                "Unknown embedding provider: '{}'. Must be hashing, local, openai, or ollama.",
                other
            ),
        }

        Ok(())
    }
}

/// Parse and validate TOML without consulting the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).context("Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

/// Read a config file, apply environment overrides, and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let mut config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but a missing file at the default location means
/// built-in defaults. A missing file the user named explicitly is an error.
pub fn load_config_or_default(path: &Path, explicit: bool) -> Result<Config> {
    if !explicit && !path.exists() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        return Ok(config);
    }
    load_config(path)
}
