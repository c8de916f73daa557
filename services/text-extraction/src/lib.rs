//! Turns form input into comparable UTF-8 text: typed text passes through,
//! uploaded `.txt` files are decoded leniently and PDFs go through the text
//! layer extractor.

mod pdf;

use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

pub use pdf::{clean_pdf_text, extract_pdf_text};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF error: {0}")]
    Pdf(String),
}

/// An uploaded file as spooled to disk by the web layer.
#[derive(Debug, Clone, Copy)]
pub struct UploadedFile<'a> {
    pub filename: &'a str,
    pub content_type: Option<&'a str>,
    pub path: &'a Path,
}

impl UploadedFile<'_> {
    pub fn is_pdf(&self) -> bool {
        let by_type = self
            .content_type
            .map(|ct| ct.trim().eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false);
        let by_ext = Path::new(self.filename)
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        by_type || by_ext
    }
}

/// Convert arbitrary bytes into a `String`, silently dropping every invalid
/// UTF-8 sequence.
pub fn ensure_utf8(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}

/// Whether the text has anything besides whitespace.
pub fn is_present(text: &str) -> bool {
    !text.trim().is_empty()
}

/// Resolve one side of a comparison.
///
/// Non-blank typed text wins. Otherwise the upload is read, as PDF or as
/// text. Failures are logged and yield an empty string, never an error.
pub fn extract_upload_text(form_text: Option<&str>, upload: Option<UploadedFile<'_>>) -> String {
    if let Some(text) = form_text.filter(|t| is_present(t)) {
        return text.to_string();
    }
    let Some(upload) = upload else {
        return String::new();
    };

    if upload.is_pdf() {
        return match extract_pdf_text(upload.path) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %upload.filename, error = %e, "PDF extraction failed");
                String::new()
            }
        };
    }

    match read_text_file(upload.path) {
        Ok(text) => {
            info!(file = %upload.filename, len = text.len(), "text upload read");
            text
        }
        Err(e) => {
            warn!(file = %upload.filename, error = %e, "upload read/encoding failed");
            String::new()
        }
    }
}

fn read_text_file(path: &Path) -> Result<String, ExtractionError> {
    let raw = std::fs::read(path)?;
    Ok(ensure_utf8(&raw))
}
