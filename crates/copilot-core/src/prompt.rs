use copilot_index::SearchResult;

pub const SYSTEM_PROMPT: &str = "\
You are RepoCopilot, an assistant that answers questions about a codebase \
using ONLY the code snippets supplied as evidence.

### Goal
Answer the user's question accurately from the supplied \"Code Context\".

### Rules
1. **Evidence only**: do not rely on outside knowledge of libraries or \
frameworks unless it is visible in the context. If the answer is not in the \
context, say that you cannot find it.
2. **Citations**: every statement about code must be followed by a citation \
in the form `[File: <file_path> (Lines <start>-<end>)]`.
   - Example: \"Login is handled by the `login` function [File: src/auth.py (Lines 10-25)].\"
3. **Be concise**: focus on logic and structure.

### Input format
The user message holds a question followed by numbered chunks:

--- Code Context ---
[Chunk 1]
File: src/main.py (Lines 10-20)
Type: function
Content:
def main():
    ...

[Chunk 2]
...
-------------------
";

pub const EVALUATOR_SYSTEM_PROMPT: &str = "You are a helpful assistant that outputs JSON.";

/// Returned without calling the LLM when retrieval finds nothing.
pub const NO_EVIDENCE_ANSWER: &str = "I couldn't find any relevant code in the repository.";

const CONTEXT_HEADER: &str = "--- Code Context ---";
const CONTEXT_FOOTER: &str = "-------------------";

/// Numbered evidence block shared by the evaluator and the final answer.
#[must_use]
pub fn format_context(evidence: &[SearchResult]) -> String {
    let mut parts = Vec::with_capacity(evidence.len() + 2);
    parts.push(CONTEXT_HEADER.to_string());
    for (i, result) in evidence.iter().enumerate() {
        let chunk = &result.chunk;
        parts.push(format!(
            "[Chunk {}]\nFile: {}\nType: {}\nContent:\n{}\n",
            i + 1,
            chunk.location(),
            chunk.chunk_type,
            chunk.content
        ));
    }
    parts.push(CONTEXT_FOOTER.to_string());
    parts.join("\n\n")
}

#[must_use]
pub fn answer_request(question: &str, context: &str) -> String {
    format!("Question: {question}\n\n{context}")
}

#[must_use]
pub fn sufficiency_request(question: &str, context: &str, schema: &str) -> String {
    format!(
        "You are an Evidence Evaluator. Decide whether the code chunks below contain \
enough implementation detail to answer the user's question.

User Question: \"{question}\"

Provided Code Context:
{context}

### Critical Instruction
- **Usage vs. Definition**: if the question asks how something is implemented \
or how it works, and the context only shows that thing being called or used \
but not its definition (the `class` or function body), set \"sufficient\" to false.
- **Incomplete Logic**: if the logic is split and a key part is missing \
(for example the class is present but its important methods are not), set \
\"sufficient\" to false.

### Output Format
Reply with a single JSON object matching this schema:
{schema}

- \"missing_info\" example: \"Only saw usages of HybridRetriever, need the class definition\"
- \"suggested_query\" example: \"class HybridRetriever implementation\"
"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use copilot_index::{ChunkType, CodeChunk, ResultSource};

    use super::*;

    fn result(path: &str, start: usize, end: usize, content: &str) -> SearchResult {
        SearchResult {
            chunk: Arc::new(CodeChunk {
                id: format!("{path}_{start}_{end}"),
                content: content.into(),
                file_path: path.into(),
                start_line: start,
                end_line: end,
                chunk_type: ChunkType::Function,
                name: None,
                parent_name: None,
                metadata: BTreeMap::new(),
            }),
            score: 1.0,
            source: ResultSource::Hybrid,
        }
    }

    #[test]
    fn context_numbers_chunks_with_location_and_type() {
        let context = format_context(&[
            result("src/auth.py", 10, 25, "def login(): pass"),
            result("src/db.py", 1, 3, "def connect(): pass"),
        ]);

        assert!(context.starts_with("--- Code Context ---\n\n[Chunk 1]\n"));
        assert!(context.contains("File: src/auth.py (Lines 10-25)\nType: function\nContent:\ndef login(): pass\n"));
        assert!(context.contains("[Chunk 2]\nFile: src/db.py (Lines 1-3)"));
        assert!(context.ends_with("\n\n-------------------"));
    }

    #[test]
    fn single_chunk_context_is_exact() {
        let context = format_context(&[result("lib.rs", 4, 6, "fn run() {}")]);
        assert_eq!(
            context,
            "--- Code Context ---\n\n\
             [Chunk 1]\nFile: lib.rs (Lines 4-6)\nType: function\nContent:\nfn run() {}\n\n\n\
             -------------------"
        );
    }

    #[test]
    fn empty_context_keeps_frame() {
        assert_eq!(
            format_context(&[]),
            "--- Code Context ---\n\n-------------------"
        );
    }

    #[test]
    fn answer_request_leads_with_question() {
        assert_eq!(answer_request("why?", "ctx"), "Question: why?\n\nctx");
    }

    #[test]
    fn system_prompt_demands_citations() {
        assert!(SYSTEM_PROMPT.contains("[File: <file_path> (Lines <start>-<end>)]"));
    }

    #[test]
    fn sufficiency_request_embeds_question_context_and_schema() {
        let prompt = sufficiency_request("How does X work?", "CTX", "{\"type\":\"object\"}");
        assert!(prompt.contains("User Question: \"How does X work?\""));
        assert!(prompt.contains("Provided Code Context:\nCTX"));
        assert!(prompt.contains("{\"type\":\"object\"}"));
    }
}
