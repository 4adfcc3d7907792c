//! Core types for document ingestion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Text-extraction strategy, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
    Markdown,
}

impl DocumentFormat {
    /// Every extension the extractor understands (lowercase, no dot).
    pub const EXTENSIONS: &'static [&'static str] = &["pdf", "docx", "txt", "md", "markdown"];

    /// Infer the format from a document name's extension (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::PlainText),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Whether documents of this format are candidates for legal risk assessment.
    pub fn is_office_document(&self) -> bool {
        matches!(self, Self::Pdf | Self::Docx)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::PlainText => "text",
            Self::Markdown => "markdown",
        };
        f.write_str(name)
    }
}

/// A document on its way into the index. Exists only during ingestion.
#[derive(Debug, Clone)]
pub struct Document {
    /// Name of the document (also its key in the corpus).
    pub name: String,

    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Create a new document.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Declared format, inferred from the name's extension.
    pub fn format(&self) -> Option<DocumentFormat> {
        DocumentFormat::from_name(&self.name)
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// A chunk of extracted text before it is embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    /// Character range `[start, end)` in the extracted text, before trimming.
    pub char_range: (usize, usize),

    /// The trimmed text content of this chunk.
    pub content: String,
}

impl RawChunk {
    /// Create a new raw chunk.
    pub fn new(char_range: (usize, usize), content: String) -> Self {
        Self {
            char_range,
            content,
        }
    }

    /// Get character count of the trimmed content.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A chunk of an indexed document, as handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Name of the owning document.
    pub document_name: String,

    /// Sequence index within the document, starting at 0.
    pub chunk_index: usize,

    /// The text content of this chunk.
    pub content: String,
}

impl DocumentChunk {
    /// Get a preview of the content (first N characters).
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => &self.content[..end],
            None => &self.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_name() {
        assert_eq!(DocumentFormat::from_name("a.pdf"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_name("A.PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(
            DocumentFormat::from_name("contracts/lease.Docx"),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(
            DocumentFormat::from_name("notes.txt"),
            Some(DocumentFormat::PlainText)
        );
        assert_eq!(
            DocumentFormat::from_name("README.markdown"),
            Some(DocumentFormat::Markdown)
        );
        assert_eq!(DocumentFormat::from_name("legacy.doc"), None);
        assert_eq!(DocumentFormat::from_name("Makefile"), None);
    }

    #[test]
    fn test_every_extension_maps_to_a_format() {
        for ext in DocumentFormat::EXTENSIONS {
            assert!(DocumentFormat::from_name(&format!("file.{ext}")).is_some());
        }
    }

    #[test]
    fn test_document_chunk_preview() {
        let chunk = DocumentChunk {
            document_name: "test.md".to_string(),
            chunk_index: 0,
            content: "Héllo, world!".to_string(),
        };

        assert_eq!(chunk.preview(5), "Héllo");
        assert_eq!(chunk.preview(100), "Héllo, world!");
    }
}
