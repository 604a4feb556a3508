use std::collections::HashSet;

use copilot_index::SearchResult;

/// Results gathered across retrieval rounds, unique by chunk id.
///
/// The first occurrence of a chunk wins and keeps its position.
#[derive(Debug, Default, Clone)]
pub struct Evidence {
    results: Vec<SearchResult>,
    seen: HashSet<String>,
}

impl Evidence {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append results whose chunk ids are new. Returns how many were added.
    pub fn merge(&mut self, results: impl IntoIterator<Item = SearchResult>) -> usize {
        let before = self.results.len();
        for result in results {
            if self.seen.insert(result.chunk.id.clone()) {
                self.results.push(result);
            }
        }
        self.results.len() - before
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SearchResult] {
        &self.results
    }

    #[must_use]
    pub fn into_results(self) -> Vec<SearchResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use copilot_index::{ChunkType, CodeChunk, ResultSource};

    use super::*;

    fn result(id: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Arc::new(CodeChunk {
                id: id.into(),
                content: id.into(),
                file_path: "lib.rs".into(),
                start_line: 1,
                end_line: 1,
                chunk_type: ChunkType::Block,
                name: None,
                parent_name: None,
                metadata: BTreeMap::new(),
            }),
            score,
            source: ResultSource::Hybrid,
        }
    }

    fn ids(evidence: &Evidence) -> Vec<&str> {
        evidence.as_slice().iter().map(|r| r.chunk.id.as_str()).collect()
    }

    #[test]
    fn first_occurrence_wins() {
        let mut evidence = Evidence::new();
        assert_eq!(evidence.merge([result("a", 0.9), result("b", 0.5)]), 2);
        assert_eq!(evidence.merge([result("b", 0.99), result("c", 0.1)]), 1);

        assert_eq!(ids(&evidence), vec!["a", "b", "c"]);
        assert!((evidence.as_slice()[1].score - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn merging_same_results_twice_is_idempotent() {
        let batch = vec![result("a", 1.0), result("b", 0.5), result("a", 0.2)];
        let mut evidence = Evidence::new();
        evidence.merge(batch.clone());
        let once: Vec<String> = ids(&evidence).into_iter().map(String::from).collect();

        assert_eq!(evidence.merge(batch), 0);
        assert_eq!(ids(&evidence), once);
        assert_eq!(evidence.len(), 2);
    }

    #[test]
    fn starts_empty() {
        let evidence = Evidence::new();
        assert!(evidence.is_empty());
        assert!(evidence.into_results().is_empty());
    }
}
