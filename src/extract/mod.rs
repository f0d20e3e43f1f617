// Text extraction module
// Collaborator boundary for turning source files into plain text


use anyhow::Result;
use std::path::Path;
use tracing::debug;

use crate::ShelfError;

/// Turns a source file into plain text.
///
/// Extraction is a pure function of the file contents; implementations hold
/// no state about what has been extracted before.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String>;
}

/// Production extractor for PDF files.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    #[inline]
    fn extract(&self, path: &Path) -> Result<String> {
        let text = pdf_extract::extract_text(path).map_err(|e| {
            ShelfError::Extraction(format!(
                "Failed to extract text from {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(
            "Extracted {} chars of text from {}",
            text.len(),
            path.display()
        );

        Ok(text)
    }
}
