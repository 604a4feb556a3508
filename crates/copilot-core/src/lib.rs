//! Configuration, LLM client, agentic answering loop and interactive session.

pub mod agent;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompt;
pub mod session;

pub use agent::{Agent, Answer, Evidence};
pub use config::Config;
pub use error::{AgentError, ConfigError};
pub use llm::{LlmClient, SufficiencyVerdict};
pub use session::Session;
