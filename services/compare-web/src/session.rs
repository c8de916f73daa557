//! Preview of the last submission, kept in an encrypted cookie so the form
//! can be pre-filled on the next visit.

use actix_web::cookie::{Cookie, CookieJar, Key, SameSite};
use actix_web::HttpRequest;
use serde::{Deserialize, Serialize};
use shared::dto::ComparisonResult;
use tracing::{debug, warn};

use crate::forms::Submission;

pub const SESSION_COOKIE: &str = "_compare_session";
/// Byte budget per text; keeps the cookie below the 4 KiB browser limit.
pub const PREVIEW_MAX_BYTES: usize = 800;
pub const TRUNCATION_MARKER: &str = "… (truncado)";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPreview {
    pub text_a: String,
    pub text_b: String,
    pub analyzer: Option<String>,
    pub ngram_range: Option<(i64, i64)>,
    pub a_from_file: bool,
    pub b_from_file: bool,
}

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("cannot encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session cookie was not written")]
    NotWritten,
}

/// Cut `text` to at most `max_bytes` on a char boundary, marking the cut.
pub fn truncate_for_session(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &text[..cut], TRUNCATION_MARKER)
}

/// Settings come from the backend's echo, not from the request.
pub fn build_preview(submission: &Submission, result: &ComparisonResult) -> SessionPreview {
    let preview_text = |text: &str, from_file: bool| {
        if from_file {
            String::new()
        } else {
            truncate_for_session(text, PREVIEW_MAX_BYTES)
        }
    };
    SessionPreview {
        text_a: preview_text(&submission.text_a, submission.a_from_file),
        text_b: preview_text(&submission.text_b, submission.b_from_file),
        analyzer: result.analyzer.clone(),
        ngram_range: result.ngram_range,
        a_from_file: submission.a_from_file,
        b_from_file: submission.b_from_file,
    }
}

/// Decrypt the preview cookie. Missing, tampered or stale cookies read as `None`.
pub fn read_preview(req: &HttpRequest, key: &Key) -> Option<SessionPreview> {
    let raw = req.cookie(SESSION_COOKIE)?;
    let mut jar = CookieJar::new();
    jar.add_original(raw);
    let Some(cookie) = jar.private(key).get(SESSION_COOKIE) else {
        debug!("session cookie failed to decrypt");
        return None;
    };
    match serde_json::from_str(cookie.value()) {
        Ok(preview) => Some(preview),
        Err(e) => {
            warn!(%e, "discarding malformed session preview");
            None
        }
    }
}

pub fn preview_cookie(preview: &SessionPreview, key: &Key) -> Result<Cookie<'static>, SessionError> {
    let value = serde_json::to_string(preview)?;
    let mut jar = CookieJar::new();
    jar.private_mut(key).add(
        Cookie::build(SESSION_COOKIE, value)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .finish(),
    );
    jar.get(SESSION_COOKIE).cloned().ok_or(SessionError::NotWritten)
}
