//! Source documents and the text extraction seam

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Declared type of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Word,
    PlainText,
}

impl DocumentKind {
    /// Detect the kind from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(DocumentKind::Pdf),
            "docx" => Ok(DocumentKind::Word),
            "txt" | "text" | "md" => Ok(DocumentKind::PlainText),
            "" => Err(Error::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))),
            other => Err(Error::UnsupportedFormat(format!(
                "'.{}' ({}); supported: .pdf, .docx, .txt, .md",
                other,
                path.display()
            ))),
        }
    }

    /// Whether section-aware chunking fits this kind by default
    pub fn is_structured(&self) -> bool {
        matches!(self, DocumentKind::Word | DocumentKind::PlainText)
    }
}

/// Raw text of one document, ready for chunking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub filename: String,
    pub text: String,
    pub kind: DocumentKind,
}

impl SourceDocument {
    pub fn new(filename: impl Into<String>, text: impl Into<String>, kind: DocumentKind) -> Self {
        Self {
            filename: filename.into(),
            text: text.into(),
            kind,
        }
    }

    /// Plain-text document, mostly handy for seeding and tests
    pub fn plain(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(filename, text, DocumentKind::PlainText)
    }
}

/// Trait for text extraction collaborators
pub trait TextExtractor: Send + Sync {
    /// Read a file and return its text, or an extraction / unsupported-format error
    fn extract(&self, path: &Path) -> Result<SourceDocument>;
}
