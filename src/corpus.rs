//! Document corpus: the external store the index is rebuilt from.

use std::fs;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("Invalid document name '{0}'")]
    InvalidName(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Corpus I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CorpusError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type CorpusResult<T> = Result<T, CorpusError>;

/// A named collection of document blobs.
///
/// Names are relative and `/`-separated.
pub trait DocumentCorpus: Send + Sync {
    /// Names of all stored documents, sorted.
    fn list(&self) -> CorpusResult<Vec<String>>;

    fn fetch(&self, name: &str) -> CorpusResult<Vec<u8>>;

    /// Store a document, returning its URI.
    fn store(&self, name: &str, bytes: &[u8]) -> CorpusResult<String>;

    fn exists(&self, name: &str) -> CorpusResult<bool>;

    fn uri(&self, name: &str) -> CorpusResult<String>;

    /// Human-readable location of the corpus.
    fn location(&self) -> String;
}

/// Corpus stored as files under a root directory.
#[derive(Debug, Clone)]
pub struct FsCorpus {
    root: PathBuf,
}

impl FsCorpus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a corpus, creating the root directory when missing.
    pub fn open(root: impl Into<PathBuf>) -> CorpusResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CorpusError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a document name to a path inside the root.
    fn resolve(&self, name: &str) -> CorpusResult<PathBuf> {
        let relative = Path::new(name);
        let valid = !name.is_empty()
            && !name.contains('\\')
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !valid {
            return Err(CorpusError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentCorpus for FsCorpus {
    fn list(&self) -> CorpusResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                CorpusError::io(path, std::io::Error::other(e.to_string()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            // Skip hidden files and anything in hidden directories
            let relative = match entry.path().strip_prefix(&self.root) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let parts: Vec<&str> = relative
                .components()
                .filter_map(|c| c.as_os_str().to_str())
                .collect();
            if parts.iter().any(|part| part.starts_with('.')) {
                continue;
            }
            names.push(parts.join("/"));
        }

        names.sort();
        Ok(names)
    }

    fn fetch(&self, name: &str) -> CorpusResult<Vec<u8>> {
        let path = self.resolve(name)?;
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CorpusError::NotFound(name.to_string()),
            _ => CorpusError::io(path, e),
        })
    }

    fn store(&self, name: &str, bytes: &[u8]) -> CorpusResult<String> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CorpusError::io(parent, e))?;
        }
        fs::write(&path, bytes).map_err(|e| CorpusError::io(&path, e))?;
        crate::debug_event!("corpus", "stored", "{name} ({} bytes)", bytes.len());
        self.uri(name)
    }

    fn exists(&self, name: &str) -> CorpusResult<bool> {
        Ok(self.resolve(name)?.is_file())
    }

    fn uri(&self, name: &str) -> CorpusResult<String> {
        let path = self.resolve(name)?;
        Ok(format!("file://{}", path.display()))
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}
