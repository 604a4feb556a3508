//! Interactive session owning at most one repository agent at a time.

use std::future::Future;

use copilot_index::Retriever;
use copilot_llm::LlmProvider;
use copilot_llm::any::AnyProvider;

use crate::agent::{Agent, Answer};
use crate::error::AgentError;

pub struct Session<R: Retriever, P: LlmProvider = AnyProvider> {
    active: Option<(String, Agent<R, P>)>,
}

impl<R: Retriever, P: LlmProvider> Default for Session<R, P> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<R: Retriever, P: LlmProvider> Session<R, P> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn active_repo(&self) -> Option<&str> {
        self.active.as_ref().map(|(name, _)| name.as_str())
    }

    /// Replace the active agent with the one `opener` produces.
    ///
    /// The current agent is closed first so its vector store lock is free
    /// before the next one is opened. On failure the session is left empty.
    ///
    /// # Errors
    ///
    /// Returns whatever `opener` fails with.
    pub async fn switch_repo<F, Fut, E>(&mut self, name: impl Into<String>, opener: F) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Agent<R, P>, E>>,
    {
        let name = name.into();
        self.close().await;
        tracing::info!(repo = %name, "switching repository");
        let agent = opener().await?;
        self.active = Some((name, agent));
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`AgentError::NoActiveRepo`] before any repository was opened,
    /// or the agent's error.
    pub async fn ask(&self, question: &str) -> Result<Answer, AgentError> {
        let Some((_, agent)) = &self.active else {
            return Err(AgentError::NoActiveRepo);
        };
        agent.answer(question).await
    }

    /// [`ask`](Self::ask) rendered for display; failures become their message.
    pub async fn respond(&self, question: &str) -> String {
        match self.ask(question).await {
            Ok(answer) => answer.to_string(),
            Err(e) => {
                tracing::warn!("question failed: {e}");
                format!("Error: {e}")
            }
        }
    }

    /// Close and drop the active agent, if any.
    pub async fn close(&mut self) {
        if let Some((name, agent)) = self.active.take() {
            tracing::debug!(repo = %name, "closing agent");
            agent.close().await;
        }
    }
}
