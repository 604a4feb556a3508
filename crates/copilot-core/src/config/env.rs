use std::path::PathBuf;

use super::{Config, Secret};

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("COPILOT_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid COPILOT_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("COPILOT_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("COPILOT_LLM_MAX_TOKENS")
            && let Ok(tokens) = v.parse::<u32>()
        {
            self.llm.max_tokens = tokens;
        }
        if let Ok(v) = std::env::var("COPILOT_OPENAI_BASE_URL") {
            self.llm.openai_base_url = v;
        }
        if let Ok(v) = std::env::var("COPILOT_OLLAMA_BASE_URL") {
            self.llm.ollama_base_url = v;
        }
        if let Ok(v) = std::env::var("COPILOT_EMBEDDING_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid COPILOT_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("COPILOT_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("COPILOT_EMBEDDING_BASE_URL") {
            self.embedding.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("COPILOT_EMBEDDING_DIMENSION")
            && let Ok(dimension) = v.parse::<usize>()
        {
            self.embedding.dimension = dimension;
        }
        if let Ok(v) = std::env::var("COPILOT_DATA_DIR") {
            self.index.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("COPILOT_COLLECTION") {
            self.index.collection = v;
        }
        if let Ok(v) = std::env::var("COPILOT_INDEX_BATCH_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.index.batch_size = size;
        }
        if let Ok(v) = std::env::var("COPILOT_AGENT_MAX_RETRIES")
            && let Ok(retries) = v.parse::<usize>()
        {
            self.agent.max_retries = retries;
        }
        if let Ok(v) = std::env::var("COPILOT_AGENT_TOP_K")
            && let Ok(top_k) = v.parse::<usize>()
        {
            self.agent.top_k = top_k;
        }
    }

    pub(crate) fn resolve_env_secrets(&mut self) {
        self.secrets.openai_api_key = ["COPILOT_OPENAI_API_KEY", "OPENAI_API_KEY"]
            .into_iter()
            .filter_map(|key| std::env::var(key).ok())
            .find(|v| !v.trim().is_empty())
            .map(Secret::new);
    }
}
