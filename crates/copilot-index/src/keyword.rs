//! Okapi BM25 keyword index with JSON persistence of chunk records.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::error::{IndexError, Result};
use crate::types::{CodeChunk, ResultSource, SearchResult};

pub const K1: f32 = 1.5;
pub const B: f32 = 0.75;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

/// Lowercased word-character runs. No stemming, no stopwords.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// Ranking statistics derived from the chunk list; never persisted.
#[derive(Debug)]
struct Bm25Stats {
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f32,
    idf: HashMap<String, f32>,
}

impl Bm25Stats {
    #[allow(clippy::cast_precision_loss)]
    fn build(chunks: &[Arc<CodeChunk>]) -> Self {
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for chunk in chunks {
            let tokens = tokenize(&chunk.content);
            doc_lens.push(tokens.len());
            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_default() += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(tf);
        }

        let n = chunks.len() as f32;
        let avg_doc_len = if chunks.is_empty() {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f32 / n
        };
        let idf = doc_freq
            .into_iter()
            .map(|(term, df)| {
                let df = df as f32;
                (term, (1.0 + (n - df + 0.5) / (df + 0.5)).ln())
            })
            .collect();

        Self {
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(&self, doc: usize, query: &[String]) -> f32 {
        let tf = &self.term_freqs[doc];
        let len_ratio = if self.avg_doc_len > 0.0 {
            self.doc_lens[doc] as f32 / self.avg_doc_len
        } else {
            0.0
        };
        query
            .iter()
            .filter_map(|term| {
                let freq = *tf.get(term)? as f32;
                let idf = self.idf.get(term).copied().unwrap_or_default();
                Some(idf * freq * (K1 + 1.0) / (freq + K1 * (1.0 - B + B * len_ratio)))
            })
            .sum()
    }
}

#[derive(Debug)]
struct Built {
    chunks: Vec<Arc<CodeChunk>>,
    stats: Bm25Stats,
}

/// In-memory BM25 index over chunk contents.
#[derive(Debug, Default)]
pub struct KeywordIndex {
    built: Option<Built>,
}

impl KeywordIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the corpus and rebuild statistics.
    pub fn index(&mut self, chunks: Vec<Arc<CodeChunk>>) {
        let stats = Bm25Stats::build(&chunks);
        tracing::debug!(chunks = chunks.len(), terms = stats.idf.len(), "keyword index built");
        self.built = Some(Built { chunks, stats });
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.built.as_ref().map_or(0, |b| b.chunks.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top `top_k` chunks by BM25 score, ties in corpus order.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::NotBuilt`] before `index` or `load`.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        let built = self.built.as_ref().ok_or(IndexError::NotBuilt)?;
        let query = tokenize(query);

        let mut scored: Vec<(usize, f32)> = (0..built.chunks.len())
            .map(|doc| (doc, built.stats.score(doc, &query)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(doc, score)| SearchResult {
                chunk: Arc::clone(&built.chunks[doc]),
                score,
                source: ResultSource::Bm25,
            })
            .collect())
    }

    /// Write chunk records as a JSON array via a temp file and rename.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is not built or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let built = self.built.as_ref().ok_or(IndexError::NotBuilt)?;
        let records: Vec<&CodeChunk> = built.chunks.iter().map(AsRef::as_ref).collect();
        let json = serde_json::to_vec_pretty(&records)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), chunks = records.len(), "keyword index saved");
        Ok(())
    }

    /// Read chunk records and re-derive statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a chunk array.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let chunks: Vec<CodeChunk> = serde_json::from_slice(&bytes)?;
        let mut index = Self::new();
        index.index(chunks.into_iter().map(Arc::new).collect());
        Ok(index)
    }
}
