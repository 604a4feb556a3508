//! Structural chunking: functions and types become addressable chunks.

use std::collections::BTreeMap;
use std::path::Path;

use tree_sitter::Parser;

use crate::error::{IndexError, Result};
use crate::languages::{Lang, UnitKinds, detect_language};
use crate::syntax::SyntaxNode;
use crate::types::{ChunkType, CodeChunk};

const IDENTIFIER_KINDS: &[&str] = &[
    "identifier",
    "type_identifier",
    "field_identifier",
    "property_identifier",
];

const ANONYMOUS: &str = "anonymous";

/// A matched node before its text is sliced out of the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StructuralUnit {
    pub chunk_type: ChunkType,
    pub name: Option<String>,
    pub parent_name: Option<String>,
    pub start_row: usize,
    pub end_row: usize,
}

/// Split a file into function and class chunks in document order.
///
/// Falls back to one `block` chunk spanning the file when the language is
/// unsupported, parsing fails, or no structural unit is found, so any
/// non-empty text yields at least one chunk.
#[must_use]
pub fn extract_structures(source: &str, file_path: &str) -> Vec<CodeChunk> {
    if source.is_empty() {
        return Vec::new();
    }

    let lang = detect_language(Path::new(file_path));
    let chunks = match lang.map(|lang| structural_chunks(source, file_path, lang)) {
        Some(Ok(chunks)) => chunks,
        Some(Err(e)) => {
            tracing::debug!(file = file_path, "structural parse skipped: {e}");
            Vec::new()
        }
        None => Vec::new(),
    };

    if chunks.is_empty() {
        vec![fallback_chunk(source, file_path, lang)]
    } else {
        chunks
    }
}

fn structural_chunks(source: &str, file_path: &str, lang: Lang) -> Result<Vec<CodeChunk>> {
    let grammar = lang.grammar().ok_or(IndexError::UnsupportedLanguage)?;

    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| IndexError::Parse(format!("set_language failed: {e}")))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| IndexError::Parse(format!("parse failed for {file_path}")))?;

    let lines: Vec<&str> = source.lines().collect();
    let units = collect_units(&tree.root_node(), lang.unit_kinds(), source);

    Ok(units
        .into_iter()
        .map(|unit| unit_to_chunk(unit, &lines, file_path, lang))
        .collect())
}

/// Pre-order walk collecting every function-like and type-like node.
pub(crate) fn collect_units<N: SyntaxNode>(
    root: &N,
    kinds: UnitKinds,
    source: &str,
) -> Vec<StructuralUnit> {
    let mut units = Vec::new();
    let mut scope = Vec::new();
    visit(root, kinds, source, &mut scope, &mut units);
    units
}

fn visit<N: SyntaxNode>(
    node: &N,
    kinds: UnitKinds,
    source: &str,
    scope: &mut Vec<String>,
    out: &mut Vec<StructuralUnit>,
) {
    let kind = node.kind();

    if kinds.functions.contains(&kind) {
        out.push(make_unit(ChunkType::Function, node, source, scope));
        return;
    }

    let is_class = kinds.classes.contains(&kind);
    if is_class {
        let unit = make_unit(ChunkType::Class, node, source, scope);
        scope.push(unit.name.clone().unwrap_or_else(|| ANONYMOUS.to_string()));
        out.push(unit);
    }

    for child in node.children() {
        visit(&child, kinds, source, scope, out);
    }

    if is_class {
        scope.pop();
    }
}

fn make_unit<N: SyntaxNode>(
    chunk_type: ChunkType,
    node: &N,
    source: &str,
    scope: &[String],
) -> StructuralUnit {
    StructuralUnit {
        chunk_type,
        name: resolve_name(node, source),
        parent_name: (!scope.is_empty()).then(|| scope.join(".")),
        start_row: node.start_row(),
        end_row: node.end_row().max(node.start_row()),
    }
}

fn resolve_name<N: SyntaxNode>(node: &N, source: &str) -> Option<String> {
    if IDENTIFIER_KINDS.contains(&node.kind()) {
        return non_empty(node.text(source));
    }
    if let Some(name) = node.field("name") {
        return non_empty(name.text(source));
    }
    // tree-sitter-rust: impl_item carries its subject in the "type" field
    if node.kind() == "impl_item"
        && let Some(ty) = node.field("type")
    {
        return non_empty(ty.text(source));
    }
    // C/C++ bury the name inside nested declarators; the leading type may be an identifier too
    if let Some(declarator) = node.field("declarator") {
        return resolve_name(&declarator, source);
    }
    node.children()
        .into_iter()
        .find(|c| IDENTIFIER_KINDS.contains(&c.kind()))
        .and_then(|ident| non_empty(ident.text(source)))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn unit_to_chunk(unit: StructuralUnit, lines: &[&str], file_path: &str, lang: Lang) -> CodeChunk {
    let start_line = unit.start_row + 1;
    let end_line = unit.end_row + 1;
    let content = lines
        .get(unit.start_row..end_line.min(lines.len()))
        .map(|slice| slice.join("\n"))
        .unwrap_or_default();

    let mut metadata = BTreeMap::new();
    metadata.insert("language".to_string(), serde_json::json!(lang.id()));

    CodeChunk {
        id: format!("{file_path}_{start_line}_{end_line}"),
        content,
        file_path: file_path.to_string(),
        start_line,
        end_line,
        chunk_type: unit.chunk_type,
        name: unit.name,
        parent_name: unit.parent_name,
        metadata,
    }
}

fn fallback_chunk(source: &str, file_path: &str, lang: Option<Lang>) -> CodeChunk {
    let lines: Vec<&str> = source.lines().collect();
    let mut metadata = BTreeMap::new();
    if let Some(lang) = lang {
        metadata.insert("language".to_string(), serde_json::json!(lang.id()));
    }

    CodeChunk {
        id: format!("{file_path}_full"),
        content: lines.join("\n"),
        file_path: file_path.to_string(),
        start_line: 1,
        end_line: lines.len().max(1),
        chunk_type: ChunkType::Block,
        name: None,
        parent_name: None,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Range;

    use super::*;

    /// Hand-built tree, independent of any grammar.
    #[derive(Debug, Clone)]
    struct ToyNode {
        kind: &'static str,
        rows: (usize, usize),
        bytes: Range<usize>,
        name: Option<Box<ToyNode>>,
        children: Vec<ToyNode>,
    }

    impl ToyNode {
        fn new(kind: &'static str, rows: (usize, usize), children: Vec<ToyNode>) -> Self {
            Self {
                kind,
                rows,
                bytes: 0..0,
                name: None,
                children,
            }
        }

        fn named(mut self, bytes: Range<usize>) -> Self {
            self.name = Some(Box::new(ToyNode {
                kind: "identifier",
                rows: self.rows,
                bytes,
                name: None,
                children: Vec::new(),
            }));
            self
        }
    }

    impl SyntaxNode for ToyNode {
        fn kind(&self) -> &str {
            self.kind
        }
        fn children(&self) -> Vec<Self> {
            self.children.clone()
        }
        fn start_row(&self) -> usize {
            self.rows.0
        }
        fn end_row(&self) -> usize {
            self.rows.1
        }
        fn byte_range(&self) -> Range<usize> {
            self.bytes.clone()
        }
        fn field(&self, name: &str) -> Option<Self> {
            (name == "name").then(|| self.name.as_deref().cloned()).flatten()
        }
    }

    const TOY_KINDS: UnitKinds = UnitKinds {
        functions: &["fn"],
        classes: &["type"],
    };

    #[test]
    fn toy_tree_walk_is_grammar_neutral() {
        // names: "Outer" 0..5, "Inner" 5..10, "run" 10..13
        let source = "OuterInnerrun";
        let tree = ToyNode::new(
            "root",
            (0, 9),
            vec![
                ToyNode::new(
                    "type",
                    (0, 8),
                    vec![ToyNode::new(
                        "type",
                        (1, 7),
                        vec![ToyNode::new(
                            "fn",
                            (2, 4),
                            vec![ToyNode::new("fn", (3, 3), vec![]).named(10..13)],
                        )
                        .named(10..13)],
                    )
                    .named(5..10)],
                )
                .named(0..5),
                ToyNode::new("type", (9, 9), vec![ToyNode::new("fn", (9, 9), vec![])]),
            ],
        );

        let units = collect_units(&tree, TOY_KINDS, source);
        let summary: Vec<_> = units
            .iter()
            .map(|u| (u.chunk_type, u.name.as_deref(), u.parent_name.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChunkType::Class, Some("Outer"), None),
                (ChunkType::Class, Some("Inner"), Some("Outer")),
                (ChunkType::Function, Some("run"), Some("Outer.Inner")),
                (ChunkType::Class, None, None),
                (ChunkType::Function, None, Some("anonymous")),
            ]
        );
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(extract_structures("", "a.py").is_empty());
    }

    #[test]
    fn whitespace_only_source_falls_back_to_block() {
        for path in ["a.py", "notes.md"] {
            let chunks = extract_structures("  \n\t\n", path);
            assert_eq!(chunks.len(), 1, "{path}");
            let chunk = &chunks[0];
            assert_eq!(chunk.id, format!("{path}_full"));
            assert_eq!(chunk.chunk_type, ChunkType::Block);
            assert_eq!((chunk.start_line, chunk.end_line), (1, 2));
        }
    }

    #[test]
    fn unsupported_language_falls_back_to_block() {
        let chunks = extract_structures("# Title\n\nSome text\n", "README.md");
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.id, "README.md_full");
        assert_eq!(chunk.chunk_type, ChunkType::Block);
        assert_eq!((chunk.start_line, chunk.end_line), (1, 3));
        assert_eq!(chunk.content, "# Title\n\nSome text");
    }

    #[cfg(feature = "lang-python")]
    mod python {
        use super::*;

        const SOURCE: &str = "\
import os

def hello():
    return \"hi\"

class World:
    def greet(self):
        return 1

    class Inner:
        def deep(self):
            def helper():
                pass
            return helper
";

        #[test]
        fn functions_and_classes_in_document_order() {
            let chunks = extract_structures(SOURCE, "pkg/mod.py");
            let names: Vec<_> = chunks
                .iter()
                .map(|c| (c.chunk_type, c.name.as_deref().unwrap_or("")))
                .collect();
            assert_eq!(
                names,
                vec![
                    (ChunkType::Function, "hello"),
                    (ChunkType::Class, "World"),
                    (ChunkType::Function, "greet"),
                    (ChunkType::Class, "Inner"),
                    (ChunkType::Function, "deep"),
                ]
            );
        }

        #[test]
        fn chunk_ids_and_content_follow_line_ranges() {
            let chunks = extract_structures(SOURCE, "pkg/mod.py");
            let hello = &chunks[0];
            assert_eq!(hello.id, "pkg/mod.py_3_4");
            assert_eq!(hello.content, "def hello():\n    return \"hi\"");
            assert_eq!(hello.metadata["language"], "python");
        }

        #[test]
        fn chunk_ids_are_deterministic() {
            let first: Vec<_> = extract_structures(SOURCE, "pkg/mod.py")
                .into_iter()
                .map(|c| c.id)
                .collect();
            let second: Vec<_> = extract_structures(SOURCE, "pkg/mod.py")
                .into_iter()
                .map(|c| c.id)
                .collect();
            assert_eq!(first, second);
        }

        #[test]
        fn nested_members_carry_dotted_parent_within_parent_range() {
            let chunks = extract_structures(SOURCE, "pkg/mod.py");
            let find = |name: &str| {
                chunks
                    .iter()
                    .find(|c| c.name.as_deref() == Some(name))
                    .unwrap()
            };
            let world = find("World");
            let greet = find("greet");
            let inner = find("Inner");
            let deep = find("deep");

            assert_eq!(greet.parent_name.as_deref(), Some("World"));
            assert_eq!(inner.parent_name.as_deref(), Some("World"));
            assert_eq!(deep.parent_name.as_deref(), Some("World.Inner"));
            assert!(world.start_line <= greet.start_line && greet.end_line <= world.end_line);
            assert!(inner.start_line <= deep.start_line && deep.end_line <= inner.end_line);
        }

        #[test]
        fn function_bodies_are_not_descended() {
            let chunks = extract_structures(SOURCE, "pkg/mod.py");
            assert!(chunks.iter().all(|c| c.name.as_deref() != Some("helper")));
        }

        #[test]
        fn module_without_units_falls_back() {
            let chunks = extract_structures("x = 1\ny = 2\n", "settings.py");
            assert_eq!(chunks.len(), 1);
            assert_eq!(chunks[0].id, "settings.py_full");
            assert_eq!(chunks[0].metadata["language"], "python");
        }
    }

    #[cfg(feature = "lang-rust")]
    #[test]
    fn rust_impl_named_by_type() {
        let source = "struct Foo;\n\nimpl Foo {\n    fn bar(&self) {}\n}\n";
        let chunks = extract_structures(source, "src/lib.rs");
        let impl_chunk = chunks
            .iter()
            .find(|c| c.start_line == 3 && c.chunk_type == ChunkType::Class)
            .unwrap();
        assert_eq!(impl_chunk.name.as_deref(), Some("Foo"));
        let bar = chunks
            .iter()
            .find(|c| c.name.as_deref() == Some("bar"))
            .unwrap();
        assert_eq!(bar.parent_name.as_deref(), Some("Foo"));
        assert_eq!(bar.id, "src/lib.rs_4_4");
    }

    #[cfg(feature = "lang-c")]
    #[test]
    fn c_function_named_through_declarator() {
        let source = "static Widget *make(void) {\n    return 0;\n}\n";
        let chunks = extract_structures(source, "src/make.c");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Function);
        assert_eq!(chunks[0].name.as_deref(), Some("make"));
    }

    #[cfg(feature = "lang-c")]
    #[test]
    fn c_plain_function_named() {
        let source = "int add(int a, int b) {\n    return a + b;\n}\n";
        let chunks = extract_structures(source, "x.c");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, "x.c_1_3");
        assert_eq!(chunks[0].name.as_deref(), Some("add"));
    }

    #[cfg(feature = "lang-c")]
    #[test]
    fn cpp_member_function_carries_class() {
        let source = "class Foo {\n  void bar() {}\n};\n";
        let chunks = extract_structures(source, "foo.cpp");
        let summary: Vec<_> = chunks
            .iter()
            .map(|c| (c.chunk_type, c.name.as_deref(), c.parent_name.as_deref()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChunkType::Class, Some("Foo"), None),
                (ChunkType::Function, Some("bar"), Some("Foo")),
            ]
        );
    }

    #[cfg(feature = "lang-lua")]
    #[test]
    fn lua_function_declarations() {
        let source = "local M = {}\n\nfunction greet(name)\n  return name\nend\n\nreturn M\n";
        let chunks = extract_structures(source, "init.lua");
        assert_eq!(chunks.len(), 1);
        let greet = &chunks[0];
        assert_eq!(greet.chunk_type, ChunkType::Function);
        assert_eq!(greet.name.as_deref(), Some("greet"));
        assert_eq!(greet.id, "init.lua_3_5");
        assert_eq!(greet.metadata["language"], "lua");
    }

    #[cfg(feature = "lang-js")]
    #[test]
    fn js_class_methods() {
        let source = "class Greeter {\n  greet() {\n    return 1;\n  }\n}\n";
        let chunks = extract_structures(source, "web/greeter.js");
        let greet = chunks
            .iter()
            .find(|c| c.chunk_type == ChunkType::Function)
            .unwrap();
        assert_eq!(greet.name.as_deref(), Some("greet"));
        assert_eq!(greet.parent_name.as_deref(), Some("Greeter"));
    }

    #[cfg(feature = "lang-go")]
    #[test]
    fn go_type_and_method() {
        let source = "package main\n\ntype Server struct {\n\tport int\n}\n\nfunc (s *Server) Run() {}\n";
        let chunks = extract_structures(source, "main.go");
        let names: Vec<_> = chunks.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec![Some("Server"), Some("Run")]);
    }
}
