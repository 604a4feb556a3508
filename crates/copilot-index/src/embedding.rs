//! Embedding backends behind one closed enum.

use copilot_llm::LlmError;
use copilot_llm::LlmProvider;
use copilot_llm::ollama::OllamaProvider;
use copilot_llm::openai::OpenAiProvider;

/// Offline embedder producing unit-length vectors.
///
/// Each text seeds a blake3 XOF stream, so the same text always maps to the
/// same vector while distinct texts land at effectively random directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub const DEFAULT_DIMENSION: usize = 1536;

    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut xof = blake3::Hasher::new().update(text.as_bytes()).finalize_xof();
        let mut vector = Vec::with_capacity(self.dimension);
        let mut buf = [0u8; 2];
        for _ in 0..self.dimension {
            xof.fill(&mut buf);
            vector.push(f32::from(u16::from_le_bytes(buf)) / 65536.0);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSION)
    }
}

/// The closed set of embedding backends.
#[derive(Debug, Clone)]
pub enum EmbeddingProvider {
    Mock(MockEmbedder),
    OpenAi(OpenAiProvider),
    Ollama(OllamaProvider),
}

impl EmbeddingProvider {
    /// One vector per input text, in input order. Empty input makes no call.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::EmbedUnsupported`] when no embedding model is
    /// configured, or an error if the backing provider fails.
    pub async fn get_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if !self.supports_embeddings() {
            return Err(LlmError::EmbedUnsupported {
                provider: self.name(),
            });
        }
        match self {
            Self::Mock(mock) => Ok(texts.iter().map(|t| mock.embed(t)).collect()),
            Self::OpenAi(provider) => provider.embed_batch(texts).await,
            Self::Ollama(provider) => provider.embed_batch(texts).await,
        }
    }

    /// Embed a single query string.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding fails or the provider returns nothing.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.get_embeddings(&[text.to_string()])
            .await?
            .pop()
            .ok_or(LlmError::EmptyResponse {
                provider: self.name(),
            })
    }

    /// Vector length, determined by embedding the string `"probe"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the probe embedding fails.
    pub async fn dimension(&self) -> Result<usize, LlmError> {
        Ok(self.embed_query("probe").await?.len())
    }

    /// False for a remote backend without an embedding model.
    #[must_use]
    pub fn supports_embeddings(&self) -> bool {
        match self {
            Self::Mock(_) => true,
            Self::OpenAi(provider) => provider.supports_embeddings(),
            Self::Ollama(provider) => provider.supports_embeddings(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::OpenAi(provider) => provider.name(),
            Self::Ollama(provider) => provider.name(),
        }
    }
}
