//! Text extraction from uploaded files

use docx_rs::{DocumentChild, read_docx};
use std::path::Path;
use tracing::debug;

use ragdesk_core::{DocumentKind, Error, Result, SourceDocument, TextExtractor};

/// Extracts text from PDF, Word and plain-text files
#[derive(Debug, Clone, Default)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    pub fn new() -> Self {
        Self
    }

    fn read_pdf(path: &Path) -> Result<String> {
        pdf_extract::extract_text(path).map_err(|e| Error::extraction(path.display().to_string(), e))
    }

    fn read_word(path: &Path) -> Result<String> {
        let bytes = std::fs::read(path).map_err(|e| Error::extraction(path.display().to_string(), e))?;
        let docx = read_docx(&bytes).map_err(|e| Error::extraction(path.display().to_string(), e))?;

        let mut text = String::new();
        for child in &docx.document.children {
            // tables are skipped; paragraphs carry the content we index
            if let DocumentChild::Paragraph(p) = child {
                text.push_str(&p.raw_text());
                text.push('\n');
            }
        }
        Ok(text)
    }

    fn read_plain(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|e| Error::extraction(path.display().to_string(), e))
    }
}

impl TextExtractor for FileTextExtractor {
    fn extract(&self, path: &Path) -> Result<SourceDocument> {
        let kind = DocumentKind::from_path(path)?;
        let text = match kind {
            DocumentKind::Pdf => Self::read_pdf(path)?,
            DocumentKind::Word => Self::read_word(path)?,
            DocumentKind::PlainText => Self::read_plain(path)?,
        };

        if text.trim().is_empty() {
            return Err(Error::extraction(path.display().to_string(), "no text found"));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(file = %filename, kind = ?kind, chars = text.chars().count(), "extracted text");

        Ok(SourceDocument::new(filename, text, kind))
    }
}
