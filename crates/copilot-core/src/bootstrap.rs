//! Application bootstrap: config resolution, provider and agent construction.

use std::path::{Path, PathBuf};

use anyhow::Context;
use copilot_index::{BuildOptions, EmbeddingProvider, HybridRetriever, MockEmbedder};
use copilot_llm::any::AnyProvider;
use copilot_llm::ollama::OllamaProvider;
use copilot_llm::openai::OpenAiProvider;

use crate::agent::Agent;
use crate::config::{Config, EmbeddingKind, ProviderKind};
use crate::error::ConfigError;
use crate::llm::LlmClient;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// `--config` flag, then `COPILOT_CONFIG`, then the bundled default path.
#[must_use]
pub fn resolve_config_path(cli_path: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var("COPILOT_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

/// Load and validate the configuration.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or holds invalid values.
pub fn load_config(cli_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = resolve_config_path(cli_path);
    let config =
        Config::load(&path).with_context(|| format!("loading config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn openai_key(config: &Config) -> Result<String, ConfigError> {
    config
        .secrets
        .openai_api_key
        .as_ref()
        .map(|key| key.expose().to_string())
        .ok_or(ConfigError::MissingApiKey { provider: "openai" })
}

/// # Errors
///
/// Returns [`ConfigError::MissingApiKey`] for `OpenAI` without a key.
pub fn create_chat_provider(config: &Config) -> Result<AnyProvider, ConfigError> {
    match config.llm.provider {
        ProviderKind::OpenAi => Ok(AnyProvider::OpenAi(OpenAiProvider::new(
            openai_key(config)?,
            config.llm.openai_base_url.clone(),
            config.llm.model.clone(),
            config.llm.max_tokens,
            None,
        ))),
        ProviderKind::Ollama => Ok(AnyProvider::Ollama(OllamaProvider::new(
            &config.llm.ollama_base_url,
            config.llm.model.clone(),
            config.embedding.model.clone(),
        ))),
    }
}

/// The deterministic mock embedder unless `use_real` is set.
///
/// # Errors
///
/// Returns [`ConfigError::MissingApiKey`] for `OpenAI` embeddings without a key,
/// or [`ConfigError::Invalid`] when the chosen backend cannot embed.
pub fn create_embedder(config: &Config, use_real: bool) -> Result<EmbeddingProvider, ConfigError> {
    let mock = || EmbeddingProvider::Mock(MockEmbedder::new(config.embedding.dimension));
    if !use_real {
        return Ok(mock());
    }

    let embedding = &config.embedding;
    let embedder = match embedding.provider {
        EmbeddingKind::Mock => mock(),
        EmbeddingKind::OpenAi => {
            let base_url = embedding
                .base_url
                .clone()
                .unwrap_or_else(|| config.llm.openai_base_url.clone());
            EmbeddingProvider::OpenAi(OpenAiProvider::new(
                openai_key(config)?,
                base_url,
                config.llm.model.clone(),
                config.llm.max_tokens,
                Some(embedding.model.clone()),
            ))
        }
        EmbeddingKind::Ollama => {
            let base_url = embedding
                .base_url
                .as_deref()
                .unwrap_or(&config.llm.ollama_base_url);
            EmbeddingProvider::Ollama(OllamaProvider::new(
                base_url,
                config.llm.model.clone(),
                embedding.model.clone(),
            ))
        }
    };

    if !embedder.supports_embeddings() {
        return Err(ConfigError::Invalid(format!(
            "{} embeddings need a model (set embedding.model or COPILOT_EMBEDDING_MODEL)",
            embedder.name()
        )));
    }
    Ok(embedder)
}

#[must_use]
pub fn build_options(config: &Config) -> BuildOptions {
    BuildOptions {
        data_dir: config.index.data_dir.clone(),
        collection: config.index.collection.clone(),
        batch_size: config.index.batch_size,
        ignore_dirs: config
            .index
            .ignore_dirs
            .as_ref()
            .map(|dirs| dirs.iter().cloned().collect()),
    }
}

/// Open the persisted indexes under the configured data directory.
///
/// # Errors
///
/// Returns an error if the embedder cannot be configured or the vector store
/// fails to open for a reason other than a concurrent build.
pub async fn open_retriever(config: &Config, use_real: bool) -> anyhow::Result<HybridRetriever> {
    let embedder = create_embedder(config, use_real)?;
    HybridRetriever::open(&config.index.data_dir, embedder, &config.index.collection)
        .await
        .with_context(|| {
            format!(
                "opening indexes in {}",
                config.index.data_dir.display()
            )
        })
}

/// Chat provider, LLM client and retriever wired into an [`Agent`].
///
/// # Errors
///
/// Returns an error if the provider is misconfigured or the indexes cannot be opened.
pub async fn create_agent(
    config: &Config,
    use_real: bool,
) -> anyhow::Result<Agent<HybridRetriever, AnyProvider>> {
    let llm = LlmClient::new(create_chat_provider(config)?)?;
    let retriever = open_retriever(config, use_real).await?;
    Ok(Agent::new(retriever, llm, &config.agent))
}
