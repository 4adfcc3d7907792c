//! Error types for text extraction.

use thiserror::Error;

/// Errors from turning raw document bytes into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Unsupported format for {name}: supported extensions are {supported}")]
    UnsupportedFormat { name: String, supported: String },

    #[error("Extraction failed for {name}: {reason}")]
    ExtractionFailed { name: String, reason: String },
}

impl ExtractError {
    pub(crate) fn unsupported(name: &str) -> Self {
        ExtractError::UnsupportedFormat {
            name: name.to_string(),
            supported: super::DocumentFormat::EXTENSIONS.join(", "),
        }
    }

    pub(crate) fn failed(name: &str, reason: impl Into<String>) -> Self {
        ExtractError::ExtractionFailed {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type ExtractResult<T> = Result<T, ExtractError>;
