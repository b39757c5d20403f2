use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Chunk window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1200
}
fn default_overlap() -> usize {
    200
}

/// Which datasets the context assembler reads, and how deep.
#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_knowledge_dataset")]
    pub knowledge_dataset: String,
    #[serde(default = "default_projects_dataset")]
    pub projects_dataset: String,
    #[serde(default = "default_scratch_dataset")]
    pub scratch_dataset: String,
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            knowledge_dataset: default_knowledge_dataset(),
            projects_dataset: default_projects_dataset(),
            scratch_dataset: default_scratch_dataset(),
            default_top_k: default_top_k(),
        }
    }
}

fn default_knowledge_dataset() -> String {
    "knowledge".to_string()
}
fn default_projects_dataset() -> String {
    "projects".to_string()
}
fn default_scratch_dataset() -> String {
    "scratch".to_string()
}
fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            api_base: default_openai_api_base(),
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReasoningConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_reasoning_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_base: default_openai_api_base(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_reasoning_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemoryConfig {
    /// How many trailing messages the context assembler includes.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_reasoning_timeout_secs() -> u64 {
    120
}
fn default_max_messages() -> usize {
    10
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

impl ReasoningConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.overlap must be smaller than chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.default_top_k < 1 {
        anyhow::bail!("retrieval.default_top_k must be >= 1");
    }

    // Validate embedding
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    // Validate reasoning
    if config.reasoning.is_enabled() && config.reasoning.model.is_none() {
        anyhow::bail!(
            "reasoning.model must be specified when provider is '{}'",
            config.reasoning.provider
        );
    }

    match config.reasoning.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown reasoning provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    if config.memory.max_messages == 0 {
        anyhow::bail!("memory.max_messages must be >= 1");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [db]
            path = "/tmp/sidekick.sqlite"
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 1200);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.retrieval.knowledge_dataset, "knowledge");
        assert_eq!(config.embedding.provider, "disabled");
        assert_eq!(config.reasoning.provider, "disabled");
        assert_eq!(config.memory.max_messages, 10);
    }

    #[test]
    fn enabled_embedding_requires_model_and_dims() {
        let dir = std::env::temp_dir().join("sidekick-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(
            &path,
            r#"
            [db]
            path = "/tmp/sidekick.sqlite"

            [embedding]
            provider = "openai"
            "#,
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }
}
