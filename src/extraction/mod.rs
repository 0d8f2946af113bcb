//! PDF text extraction.
//!
//! The pipeline treats extraction as a black box: raw bytes in, page-ordered text out. The
//! default [`PdfExtractor`] is backed by `lopdf`; tests substitute their own [`TextExtractor`].

use lopdf::Document;
use thiserror::Error;

/// Errors raised while turning uploaded bytes into text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The bytes could not be parsed as a PDF document.
    #[error("Failed to read PDF: {0}")]
    Unreadable(String),
    /// The document parsed but has no pages.
    #[error("PDF contains no pages")]
    NoPages,
    /// The blocking extraction task did not complete.
    #[error("Extraction task failed: {0}")]
    Worker(String),
}

/// Interface implemented by text extraction backends.
///
/// Implementations are called from a blocking worker thread and must be shareable.
pub trait TextExtractor: Send + Sync {
    /// Extract the document text in page order.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// `lopdf`-backed extractor that concatenates the text of every page.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// Construct a new extractor.
    pub const fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let document =
            Document::load_mem(bytes).map_err(|err| ExtractionError::Unreadable(err.to_string()))?;
        let pages = document.get_pages();
        if pages.is_empty() {
            return Err(ExtractionError::NoPages);
        }

        let mut text = String::new();
        for page_number in pages.keys() {
            match document.extract_text(&[*page_number]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(err) => {
                    tracing::warn!(page = page_number, error = %err, "Failed to extract page text");
                }
            }
        }

        tracing::debug!(
            pages = pages.len(),
            chars = text.chars().count(),
            "Extracted PDF text"
        );
        Ok(text)
    }
}

/// Cheap sanity check that the payload starts with the PDF header.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(5).any(|window| window == b"%PDF-")
}
