//! Core records shared by every index: chunks and scored results.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Structural category of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Function,
    Class,
    /// Whole-file fallback.
    #[default]
    Block,
    Docstring,
}

impl ChunkType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Block => "block",
            Self::Docstring => "docstring",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable, line-ranged slice of a source file.
///
/// Chunks are never mutated after creation. Lines are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub id: String,
    pub content: String,
    pub file_path: String,
    #[serde(default)]
    pub start_line: usize,
    #[serde(default)]
    pub end_line: usize,
    #[serde(rename = "type", default)]
    pub chunk_type: ChunkType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl CodeChunk {
    /// Chunk fields without `id`, as stored next to a vector.
    ///
    /// # Errors
    ///
    /// Returns an error if a metadata value fails to serialize.
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("id");
        }
        Ok(value)
    }

    /// Rebuild a chunk from a stored payload and its point id.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload lacks required chunk fields.
    pub fn from_payload(id: String, payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut value = payload;
        if let Some(map) = value.as_object_mut() {
            map.insert("id".into(), serde_json::Value::String(id));
        }
        serde_json::from_value(value)
    }

    /// `"path (Lines s-e)"` label used in prompts and listings.
    #[must_use]
    pub fn location(&self) -> String {
        format!(
            "{} (Lines {}-{})",
            self.file_path, self.start_line, self.end_line
        )
    }
}

/// Which ranking produced a [`SearchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    Vector,
    Bm25,
    Hybrid,
}

impl ResultSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Bm25 => "bm25",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for ResultSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk paired with a score. Scores are comparable only within one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub chunk: Arc<CodeChunk>,
    pub score: f32,
    pub source: ResultSource,
}

#[cfg(test)]
pub(crate) fn test_chunk(id: &str, file_path: &str, content: &str) -> CodeChunk {
    CodeChunk {
        id: id.into(),
        content: content.into(),
        file_path: file_path.into(),
        start_line: 1,
        end_line: content.lines().count().max(1),
        chunk_type: ChunkType::Block,
        name: None,
        parent_name: None,
        metadata: BTreeMap::new(),
    }
}
