//! LLM provider abstraction and backend implementations.
//!
//! Providers serve two roles in the pipeline: chat completion for answering
//! and sufficiency evaluation, and batch embedding for the vector index.

pub mod any;
pub mod error;
pub(crate) mod http;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use provider::{LlmProvider, Message, Role};
