//! Agentic answering loop: retrieve, judge the evidence, reformulate, answer.

mod evidence;

pub use evidence::Evidence;

use std::fmt;

use copilot_index::{Retriever, SearchResult};
use copilot_llm::any::AnyProvider;
use copilot_llm::{LlmProvider, Message};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::prompt::{NO_EVIDENCE_ANSWER, SYSTEM_PROMPT, answer_request, format_context};

/// Final reply with the evidence it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub content: String,
    pub sources: Vec<SearchResult>,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)?;
        if self.sources.is_empty() {
            return Ok(());
        }
        f.write_str("\n\nSources:")?;
        for source in &self.sources {
            let chunk = &source.chunk;
            write!(f, "\n- {} [{}", chunk.location(), chunk.chunk_type)?;
            if let Some(name) = &chunk.name {
                write!(f, " {name}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

pub struct Agent<R: Retriever, P: LlmProvider = AnyProvider> {
    retriever: R,
    llm: LlmClient<P>,
    max_retries: usize,
    top_k: usize,
}

impl<R: Retriever, P: LlmProvider> Agent<R, P> {
    #[must_use]
    pub fn new(retriever: R, llm: LlmClient<P>, config: &AgentConfig) -> Self {
        Self {
            retriever,
            llm,
            max_retries: config.max_retries,
            top_k: config.top_k,
        }
    }

    #[must_use]
    pub fn retriever(&self) -> &R {
        &self.retriever
    }

    #[must_use]
    pub fn llm(&self) -> &LlmClient<P> {
        &self.llm
    }

    /// Answer `question` from repository evidence.
    ///
    /// Runs at most `max_retries + 1` retrieval rounds. Between rounds the LLM
    /// judges the cumulative evidence against the original question and may
    /// suggest a better query. When nothing is found after the first round the
    /// fixed no-evidence answer is returned without calling the LLM.
    ///
    /// # Errors
    ///
    /// Returns an error if the final answer request fails. Retrieval and
    /// evaluation failures degrade instead of erroring.
    pub async fn answer(&self, question: &str) -> Result<Answer, AgentError> {
        let attempts = self.max_retries + 1;
        let mut evidence = Evidence::new();
        let mut query = question.to_string();

        for attempt in 1..=attempts {
            tracing::info!(attempt, attempts, query = %query, "retrieving evidence");
            let results = self.retriever.search(&query, self.top_k).await;
            let added = evidence.merge(results);
            tracing::debug!(added, total = evidence.len(), "merged evidence");

            if attempt == 1 && evidence.is_empty() {
                tracing::info!("no evidence found");
                return Ok(Answer {
                    content: NO_EVIDENCE_ANSWER.to_string(),
                    sources: Vec::new(),
                });
            }

            if attempt == attempts {
                break;
            }

            let context = format_context(evidence.as_slice());
            let verdict = self.llm.evaluate_sufficiency(question, &context).await;
            if verdict.sufficient {
                tracing::info!(attempt, "evidence judged sufficient");
                break;
            }
            tracing::info!(
                attempt,
                missing = %verdict.missing_info,
                "evidence insufficient, reformulating"
            );
            query = verdict.next_query(question).to_string();
        }

        let context = format_context(evidence.as_slice());
        let messages = [
            Message::system(SYSTEM_PROMPT),
            Message::user(answer_request(question, &context)),
        ];
        let content = self.llm.chat(&messages).await?;

        Ok(Answer {
            content,
            sources: evidence.into_results(),
        })
    }

    /// Release the retriever's resources.
    pub async fn close(&self) {
        self.retriever.close().await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use copilot_index::{ChunkType, CodeChunk, ResultSource};
    use copilot_llm::Role;
    use copilot_llm::mock::MockProvider;

    use super::*;

    fn chunk_result(id: &str, path: &str, content: &str) -> SearchResult {
        SearchResult {
            chunk: Arc::new(CodeChunk {
                id: id.into(),
                content: content.into(),
                file_path: path.into(),
                start_line: 1,
                end_line: 5,
                chunk_type: ChunkType::Class,
                name: Some(id.into()),
                parent_name: None,
                metadata: BTreeMap::new(),
            }),
            score: 1.0,
            source: ResultSource::Hybrid,
        }
    }

    /// Returns canned results per query and records every query it sees.
    #[derive(Default)]
    struct ScriptedRetriever {
        answers: HashMap<String, Vec<SearchResult>>,
        fallback: Vec<SearchResult>,
        queries: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl ScriptedRetriever {
        fn with(mut self, query: &str, results: Vec<SearchResult>) -> Self {
            self.answers.insert(query.into(), results);
            self
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl Retriever for ScriptedRetriever {
        async fn search(&self, query: &str, _top_k: usize) -> Vec<SearchResult> {
            self.queries.lock().unwrap().push(query.to_string());
            self.answers
                .get(query)
                .cloned()
                .unwrap_or_else(|| self.fallback.clone())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn agent(
        retriever: ScriptedRetriever,
        responses: &[&str],
        max_retries: usize,
    ) -> Agent<ScriptedRetriever, MockProvider> {
        let provider = MockProvider::with_responses(responses.iter().map(|s| (*s).to_string()).collect());
        let config = AgentConfig {
            max_retries,
            top_k: 10,
        };
        Agent::new(retriever, LlmClient::new(provider).unwrap(), &config)
    }

    const QUESTION: &str = "How is HybridRetriever implemented?";
    const REFORMULATED: &str = "class HybridRetriever implementation";

    #[tokio::test]
    async fn reformulates_until_attempts_run_out() {
        let usage = chunk_result("main.py_1_5", "main.py", "retriever = HybridRetriever()");
        let definition = chunk_result("engine.py_1_5", "engine.py", "class HybridRetriever: ...");
        let retriever = ScriptedRetriever::default()
            .with(QUESTION, vec![usage.clone()])
            .with(REFORMULATED, vec![definition.clone(), usage.clone()]);
        let insufficient = r#"{"sufficient": false, "missing_info": "only usages", "suggested_query": "class HybridRetriever implementation"}"#;
        let agent = agent(retriever, &[insufficient, insufficient, "final answer"], 2);

        let answer = agent.answer(QUESTION).await.unwrap();

        assert_eq!(
            agent.retriever().queries(),
            vec![QUESTION, REFORMULATED, REFORMULATED]
        );
        assert_eq!(answer.content, "final answer");
        let ids: Vec<&str> = answer.sources.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["main.py_1_5", "engine.py_1_5"]);

        let requests = agent.llm().provider().requests();
        assert_eq!(requests.len(), 3);
        // Evaluation always judges against the original question.
        assert!(requests[1][1].content.contains(QUESTION));
        let final_request = &requests[2];
        assert_eq!(final_request[0].role, Role::System);
        assert_eq!(final_request[0].content, SYSTEM_PROMPT);
        assert!(final_request[1].content.starts_with(&format!("Question: {QUESTION}\n\n")));
        assert!(final_request[1].content.contains("File: engine.py (Lines 1-5)"));
    }

    #[tokio::test]
    async fn sufficient_evidence_skips_further_rounds() {
        let retriever = ScriptedRetriever {
            fallback: vec![chunk_result("a", "a.py", "def a(): pass")],
            ..ScriptedRetriever::default()
        };
        let agent = agent(retriever, &[r#"{"sufficient": true}"#, "done"], 2);

        let answer = agent.answer("what does a do?").await.unwrap();
        assert_eq!(answer.content, "done");
        assert_eq!(agent.retriever().queries().len(), 1);
        assert_eq!(agent.llm().provider().requests().len(), 2);
    }

    #[tokio::test]
    async fn empty_first_round_returns_fixed_answer() {
        let agent = agent(ScriptedRetriever::default(), &[], 2);

        let answer = agent.answer("anything?").await.unwrap();
        assert_eq!(answer.content, NO_EVIDENCE_ANSWER);
        assert!(answer.sources.is_empty());
        assert!(agent.llm().provider().requests().is_empty());
        assert_eq!(agent.retriever().queries().len(), 1);
    }

    #[tokio::test]
    async fn zero_retries_answers_after_one_round_without_evaluation() {
        let retriever = ScriptedRetriever {
            fallback: vec![chunk_result("a", "a.py", "def a(): pass")],
            ..ScriptedRetriever::default()
        };
        let agent = agent(retriever, &["only answer"], 0);

        let answer = agent.answer("q").await.unwrap();
        assert_eq!(answer.content, "only answer");
        assert_eq!(agent.llm().provider().requests().len(), 1);
    }

    #[tokio::test]
    async fn unparseable_verdicts_still_terminate() {
        let retriever = ScriptedRetriever {
            fallback: vec![chunk_result("a", "a.py", "def a(): pass")],
            ..ScriptedRetriever::default()
        };
        // Every reply is garbage, so each evaluation retries the original query.
        let agent = agent(retriever, &[], 3);

        let answer = agent.answer("q").await.unwrap();
        assert_eq!(answer.content, "mock response");
        assert_eq!(agent.retriever().queries(), vec!["q"; 4]);
        assert_eq!(agent.llm().provider().requests().len(), 4);
        assert_eq!(answer.sources.len(), 1);
    }

    #[tokio::test]
    async fn final_chat_failure_is_an_error() {
        let retriever = ScriptedRetriever {
            fallback: vec![chunk_result("a", "a.py", "def a(): pass")],
            ..ScriptedRetriever::default()
        };
        let config = AgentConfig {
            max_retries: 1,
            top_k: 5,
        };
        let agent = Agent::new(
            retriever,
            LlmClient::new(MockProvider::failing()).unwrap(),
            &config,
        );

        assert!(matches!(agent.answer("q").await, Err(AgentError::Llm(_))));
    }

    #[tokio::test]
    async fn close_reaches_retriever() {
        let agent = agent(ScriptedRetriever::default(), &[], 2);
        agent.close().await;
        assert!(agent.retriever().closed.load(Ordering::SeqCst));
    }

    #[test]
    fn answer_display_lists_sources() {
        let answer = Answer {
            content: "It is a class.".into(),
            sources: vec![chunk_result("Engine", "engine.py", "class Engine: ...")],
        };
        assert_eq!(
            answer.to_string(),
            "It is a class.\n\nSources:\n- engine.py (Lines 1-5) [class Engine]"
        );
    }
}
