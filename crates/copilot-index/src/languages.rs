//! Language detection and tree-sitter grammar registry.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported language with its tree-sitter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Lua,
}

/// Node kinds that become chunks for one grammar.
#[derive(Debug, Clone, Copy)]
pub struct UnitKinds {
    /// Emitted as `function`; traversal stops at these.
    pub functions: &'static [&'static str],
    /// Emitted as `class`; traversal continues into members.
    pub classes: &'static [&'static str],
}

impl Lang {
    /// Identifier recorded in chunk metadata.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Rust => "rust",
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::Go => "go",
            Self::Java => "java",
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::CSharp => "csharp",
            Self::Lua => "lua",
        }
    }

    /// Get the tree-sitter grammar. Returns `None` if the
    /// corresponding feature is not enabled.
    #[must_use]
    pub fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-rust")]
            Self::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            #[cfg(feature = "lang-python")]
            Self::Python => Some(tree_sitter_python::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            #[cfg(feature = "lang-js")]
            Self::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            #[cfg(feature = "lang-js")]
            Self::Tsx => Some(tree_sitter_typescript::LANGUAGE_TSX.into()),
            #[cfg(feature = "lang-go")]
            Self::Go => Some(tree_sitter_go::LANGUAGE.into()),
            #[cfg(feature = "lang-java")]
            Self::Java => Some(tree_sitter_java::LANGUAGE.into()),
            #[cfg(feature = "lang-c")]
            Self::C => Some(tree_sitter_c::LANGUAGE.into()),
            #[cfg(feature = "lang-c")]
            Self::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            #[cfg(feature = "lang-csharp")]
            Self::CSharp => Some(tree_sitter_c_sharp::LANGUAGE.into()),
            #[cfg(feature = "lang-lua")]
            Self::Lua => Some(tree_sitter_lua::LANGUAGE.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Function-like and type-like node kinds for this grammar.
    #[must_use]
    pub fn unit_kinds(self) -> UnitKinds {
        match self {
            Self::Rust => UnitKinds {
                functions: &["function_item", "function_signature_item"],
                classes: &[
                    "struct_item",
                    "enum_item",
                    "trait_item",
                    "impl_item",
                    "union_item",
                ],
            },
            Self::Python => UnitKinds {
                functions: &["function_definition"],
                classes: &["class_definition"],
            },
            Self::JavaScript | Self::TypeScript | Self::Tsx => UnitKinds {
                functions: &[
                    "function_declaration",
                    "generator_function_declaration",
                    "method_definition",
                ],
                classes: &[
                    "class_declaration",
                    "abstract_class_declaration",
                    "interface_declaration",
                    "enum_declaration",
                ],
            },
            Self::Go => UnitKinds {
                functions: &["function_declaration", "method_declaration"],
                classes: &["type_spec"],
            },
            Self::Java => UnitKinds {
                functions: &["method_declaration", "constructor_declaration"],
                classes: &[
                    "class_declaration",
                    "interface_declaration",
                    "enum_declaration",
                    "record_declaration",
                ],
            },
            Self::C => UnitKinds {
                functions: &["function_definition"],
                classes: &["struct_specifier", "enum_specifier", "union_specifier"],
            },
            Self::Cpp => UnitKinds {
                functions: &["function_definition"],
                classes: &["class_specifier", "struct_specifier", "enum_specifier"],
            },
            Self::CSharp => UnitKinds {
                functions: &["method_declaration", "constructor_declaration"],
                classes: &[
                    "class_declaration",
                    "struct_declaration",
                    "interface_declaration",
                    "enum_declaration",
                    "record_declaration",
                ],
            },
            Self::Lua => UnitKinds {
                functions: &["function_declaration"],
                classes: &[],
            },
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Detect language from file extension.
#[must_use]
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "rs" => Some(Lang::Rust),
        "py" | "pyi" => Some(Lang::Python),
        "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
        "ts" | "mts" | "cts" => Some(Lang::TypeScript),
        "tsx" => Some(Lang::Tsx),
        "go" => Some(Lang::Go),
        "java" => Some(Lang::Java),
        "c" | "h" => Some(Lang::C),
        "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Some(Lang::Cpp),
        "cs" => Some(Lang::CSharp),
        "lua" => Some(Lang::Lua),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_language_common_extensions() {
        assert_eq!(detect_language(Path::new("src/main.rs")), Some(Lang::Rust));
        assert_eq!(detect_language(Path::new("app.py")), Some(Lang::Python));
        assert_eq!(detect_language(Path::new("ui/App.tsx")), Some(Lang::Tsx));
        assert_eq!(detect_language(Path::new("Main.java")), Some(Lang::Java));
        assert_eq!(detect_language(Path::new("include/x.h")), Some(Lang::C));
        assert_eq!(detect_language(Path::new("lib.hpp")), Some(Lang::Cpp));
        assert_eq!(detect_language(Path::new("Program.cs")), Some(Lang::CSharp));
        assert_eq!(detect_language(Path::new("lua/init.lua")), Some(Lang::Lua));
    }

    #[test]
    fn detect_language_is_case_insensitive() {
        assert_eq!(detect_language(Path::new("LEGACY.PY")), Some(Lang::Python));
    }

    #[test]
    fn detect_language_unknown_ext_returns_none() {
        assert_eq!(detect_language(Path::new("notes.md")), None);
        assert_eq!(detect_language(Path::new("Dockerfile")), None);
    }

    #[test]
    fn unit_kinds_do_not_overlap() {
        let langs = [
            Lang::Rust,
            Lang::Python,
            Lang::JavaScript,
            Lang::TypeScript,
            Lang::Tsx,
            Lang::Go,
            Lang::Java,
            Lang::C,
            Lang::Cpp,
            Lang::CSharp,
            Lang::Lua,
        ];
        for lang in langs {
            let kinds = lang.unit_kinds();
            assert!(!kinds.functions.is_empty(), "{lang}");
            assert!(
                kinds.functions.iter().all(|f| !kinds.classes.contains(f)),
                "{lang}"
            );
        }
    }

    #[test]
    fn grammar_returns_some_for_enabled_features() {
        #[cfg(feature = "lang-rust")]
        assert!(Lang::Rust.grammar().is_some());
        #[cfg(feature = "lang-python")]
        assert!(Lang::Python.grammar().is_some());
        #[cfg(feature = "lang-js")]
        {
            assert!(Lang::JavaScript.grammar().is_some());
            assert!(Lang::TypeScript.grammar().is_some());
            assert!(Lang::Tsx.grammar().is_some());
        }
        #[cfg(feature = "lang-go")]
        assert!(Lang::Go.grammar().is_some());
        #[cfg(feature = "lang-java")]
        assert!(Lang::Java.grammar().is_some());
        #[cfg(feature = "lang-c")]
        {
            assert!(Lang::C.grammar().is_some());
            assert!(Lang::Cpp.grammar().is_some());
        }
        #[cfg(feature = "lang-csharp")]
        assert!(Lang::CSharp.grammar().is_some());
        #[cfg(feature = "lang-lua")]
        assert!(Lang::Lua.grammar().is_some());
    }
}
