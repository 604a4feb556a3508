//! Chat client with a sufficiency judge on top of an [`LlmProvider`].

use std::sync::LazyLock;

use copilot_llm::any::AnyProvider;
use copilot_llm::{LlmError, LlmProvider, Message};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::prompt::{EVALUATOR_SYSTEM_PROMPT, sufficiency_request};

static VERDICT_SCHEMA: LazyLock<String> = LazyLock::new(|| {
    let schema = schemars::schema_for!(SufficiencyVerdict);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
});

/// The evaluator's judgement of whether gathered evidence answers a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SufficiencyVerdict {
    /// True only when the context contains the implementation needed to answer.
    pub sufficient: bool,
    /// What is still missing, e.g. a class definition that was only seen in use.
    #[serde(default)]
    pub missing_info: String,
    /// A better search query for the missing information.
    #[serde(default)]
    pub suggested_query: Option<String>,
}

impl SufficiencyVerdict {
    fn insufficient(query: &str, missing_info: impl Into<String>) -> Self {
        Self {
            sufficient: false,
            missing_info: missing_info.into(),
            suggested_query: Some(query.to_string()),
        }
    }

    /// The query for the next retrieval round, `original` when none was suggested.
    #[must_use]
    pub fn next_query<'a>(&'a self, original: &'a str) -> &'a str {
        match self.suggested_query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q,
            _ => original,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmClient<P: LlmProvider = AnyProvider> {
    provider: P,
}

impl<P: LlmProvider> LlmClient<P> {
    /// Wrap `provider`, whose model identity is fixed from here on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingModel`] if the provider has no model set.
    pub fn new(provider: P) -> Result<Self, ConfigError> {
        if provider.model().trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        Ok(Self { provider })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// # Errors
    ///
    /// Returns an error if the provider request fails.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.provider.chat(messages).await
    }

    /// Ask the model whether `context` is enough to answer `query`.
    ///
    /// Never fails: transport errors and unparseable replies both come back
    /// as an insufficient verdict that suggests retrying with `query`.
    pub async fn evaluate_sufficiency(&self, query: &str, context: &str) -> SufficiencyVerdict {
        let messages = [
            Message::system(EVALUATOR_SYSTEM_PROMPT),
            Message::user(sufficiency_request(query, context, &VERDICT_SCHEMA)),
        ];

        let raw = match self.provider.chat_json(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), "sufficiency check failed: {e}");
                return SufficiencyVerdict::insufficient(query, e.to_string());
            }
        };

        match serde_json::from_str::<SufficiencyVerdict>(strip_code_fences(&raw)) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("unparseable sufficiency verdict: {e}");
                SufficiencyVerdict::insufficient(query, "parse failure")
            }
        }
    }
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    body.strip_suffix("```").unwrap_or(body).trim()
}
