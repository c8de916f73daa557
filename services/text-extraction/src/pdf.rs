use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::{ensure_utf8, ExtractionError};

static HYPHEN_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"-\r*\n[ \t\r\n\x0B\x0C]*").unwrap());
static HORIZONTAL_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

const PAGE_SEPARATOR: &str = "\n\n";

/// Extract the text layer of a PDF, page by page, and clean it up.
pub fn extract_pdf_text(path: &Path) -> Result<String, ExtractionError> {
    info!(?path, "starting pdf text extraction");
    let data = std::fs::read(path)?;
    let pages = extract_pages(&data)?;
    debug!(pages = pages.len(), "pdf pages extracted");
    let cleaned = clean_pdf_text(&pages.join(PAGE_SEPARATOR));
    info!(len = cleaned.len(), "pdf text extracted");
    Ok(cleaned)
}

fn extract_pages(data: &[u8]) -> Result<Vec<String>, ExtractionError> {
    // pdf-extract panics on some malformed documents instead of returning an error
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(data)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(ExtractionError::Pdf(e.to_string())),
        Err(_) => Err(ExtractionError::Pdf("pdf parser panicked".into())),
    }
}

/// Normalise raw PDF text.
///
/// Steps, in order: drop soft hyphens, join words hyphenated across a line
/// break, drop carriage returns, squeeze spaces/tabs, cap blank lines at one.
/// Running it on its own output is a no-op.
pub fn clean_pdf_text(raw: &str) -> String {
    let text = raw.replace('\u{00AD}', "");
    let text = HYPHEN_BREAK.replace_all(&text, "");
    let text = text.replace('\r', "");
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = EXCESS_NEWLINES.replace_all(&text, "\n\n");
    ensure_utf8(text.as_bytes())
}
