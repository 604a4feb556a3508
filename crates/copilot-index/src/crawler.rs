//! Repository walk yielding indexable source, markup and config files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Directory names pruned by default, in addition to any dot-prefixed directory.
pub const DEFAULT_IGNORE_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "env",
    "venv",
    "node_modules",
    "runs",
    "weights",
    "target",
    "build",
    "dist",
];

const ALLOWED_EXTENSIONS: &[&str] = &[
    "py", "c", "cpp", "cc", "cxx", "h", "hpp", "hxx", "hh", "cs", "rs", "go", "ts", "tsx", "js",
    "java", "lua", "html", "css", "scss", "less", "json", "yaml", "yml", "md", "xml", "toml",
    "ini", "conf", "dockerfile",
];

const ALLOWED_FILE_NAMES: &[&str] = &["Dockerfile", ".gitignore"];

/// Walks a repository root, pruning ignored directories before descent.
#[derive(Debug, Clone)]
pub struct RepositoryCrawler {
    root: PathBuf,
    ignore_dirs: HashSet<String>,
}

impl RepositoryCrawler {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_dirs: DEFAULT_IGNORE_DIRS.iter().map(|d| (*d).to_string()).collect(),
        }
    }

    /// Replace the default ignore set.
    #[must_use]
    pub fn with_ignore_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yield allowed files. Each call starts a fresh walk.
    ///
    /// `.gitignore` rules are not applied; only the ignore set and
    /// dot-directories prune the tree.
    pub fn scan(&self) -> impl Iterator<Item = PathBuf> + use<> {
        let ignore_dirs = self.ignore_dirs.clone();

        ignore::WalkBuilder::new(&self.root)
            .standard_filters(false)
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                !name.starts_with('.') && !ignore_dirs.contains(&*name)
            })
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|path| is_allowed(path))
    }
}

/// Whether a file's extension or exact name is on the allow-list.
#[must_use]
pub fn is_allowed(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    if ALLOWED_FILE_NAMES.contains(&file_name) {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}
