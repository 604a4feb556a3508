use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no chat model configured (set llm.model or COPILOT_LLM_MODEL)")]
    MissingModel,

    #[error("{provider} requires an API key (set COPILOT_OPENAI_API_KEY or OPENAI_API_KEY)")]
    MissingApiKey { provider: &'static str },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] copilot_llm::LlmError),

    #[error("no repository is active; switch to one first")]
    NoActiveRepo,
}
