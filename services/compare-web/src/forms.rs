//! Multipart parsing of the comparison form.

use actix_multipart::{Field, Multipart};
use actix_web::{http::StatusCode, ResponseError};
use futures_util::StreamExt as _;
use shared::dto::{CompareRequest, DEFAULT_ANALYZER, DEFAULT_NGRAM_RANGE};
use tempfile::NamedTempFile;
use text_extraction::{ensure_utf8, extract_upload_text, is_present, UploadedFile};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum FormError {
    #[error("multipart error: {0}")]
    Multipart(String),
    #[error("field {field} exceeds {limit} bytes")]
    TooLarge { field: String, limit: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResponseError for FormError {
    fn status_code(&self) -> StatusCode {
        match self {
            FormError::Multipart(_) => StatusCode::BAD_REQUEST,
            FormError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            FormError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// An upload written to a temporary file that is removed on drop.
#[derive(Debug)]
pub struct SpooledUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub file: NamedTempFile,
}

impl SpooledUpload {
    pub fn as_uploaded(&self) -> UploadedFile<'_> {
        UploadedFile {
            filename: &self.filename,
            content_type: self.content_type.as_deref(),
            path: self.file.path(),
        }
    }
}

/// Raw form fields, before any normalisation.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub text_a: Option<String>,
    pub text_b: Option<String>,
    pub file_a: Option<SpooledUpload>,
    pub file_b: Option<SpooledUpload>,
    pub analyzer: Option<String>,
    pub ngram_min: Option<String>,
    pub ngram_max: Option<String>,
}

/// Normalised submission, ready to be sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub text_a: String,
    pub text_b: String,
    pub analyzer: String,
    pub ngram_range: (i64, i64),
    pub a_from_file: bool,
    pub b_from_file: bool,
}

impl Submission {
    pub fn is_complete(&self) -> bool {
        is_present(&self.text_a) && is_present(&self.text_b)
    }

    pub fn to_request(&self) -> CompareRequest {
        CompareRequest {
            text_a: self.text_a.clone(),
            text_b: self.text_b.clone(),
            analyzer: self.analyzer.clone(),
            ngram_range: self.ngram_range,
        }
    }
}

impl SubmissionForm {
    /// Resolve both sides to text. Reads uploads from disk, so call it off
    /// the async executor.
    pub fn into_submission(self) -> Submission {
        let analyzer = presence(self.analyzer).unwrap_or_else(|| DEFAULT_ANALYZER.to_string());
        let ngram_min = presence(self.ngram_min)
            .map(|v| leading_int(&v))
            .unwrap_or(DEFAULT_NGRAM_RANGE.0);
        let ngram_max = presence(self.ngram_max)
            .map(|v| leading_int(&v))
            .unwrap_or(DEFAULT_NGRAM_RANGE.1);

        let text_a = extract_upload_text(
            self.text_a.as_deref(),
            self.file_a.as_ref().map(SpooledUpload::as_uploaded),
        );
        let text_b = extract_upload_text(
            self.text_b.as_deref(),
            self.file_b.as_ref().map(SpooledUpload::as_uploaded),
        );

        Submission {
            text_a,
            text_b,
            analyzer,
            ngram_range: (ngram_min, ngram_max),
            a_from_file: self.file_a.is_some(),
            b_from_file: self.file_b.is_some(),
        }
    }
}

fn presence(value: Option<String>) -> Option<String> {
    value.filter(|v| is_present(v))
}

/// Lenient integer parse: optional sign and leading digits, `0` otherwise.
fn leading_int(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Accepts both `submission[text_a]` and bare `text_a` field names.
fn field_key(name: &str) -> &str {
    name.strip_prefix("submission[")
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(name)
}

pub async fn read_submission(
    mut payload: Multipart,
    max_bytes: usize,
) -> Result<SubmissionForm, FormError> {
    let mut form = SubmissionForm::default();
    while let Some(field) = payload.next().await {
        let mut field = field.map_err(|e| FormError::Multipart(e.to_string()))?;
        let key = field_key(field.name()).to_string();
        match key.as_str() {
            "file_a" | "file_b" => {
                let filename = field
                    .content_disposition()
                    .get_filename()
                    .unwrap_or_default()
                    .to_string();
                let content_type = field.content_type().map(|m| m.essence_str().to_string());
                let upload = spool(&mut field, &key, filename, content_type, max_bytes).await?;
                if key == "file_a" {
                    form.file_a = upload;
                } else {
                    form.file_b = upload;
                }
            }
            "text_a" | "text_b" | "analyzer" | "ngram_min" | "ngram_max" => {
                let value = read_value(&mut field, &key, max_bytes).await?;
                let slot = match key.as_str() {
                    "text_a" => &mut form.text_a,
                    "text_b" => &mut form.text_b,
                    "analyzer" => &mut form.analyzer,
                    "ngram_min" => &mut form.ngram_min,
                    _ => &mut form.ngram_max,
                };
                *slot = Some(value);
            }
            other => {
                debug!(field = other, "ignoring form field");
                drain(&mut field).await?;
            }
        }
    }
    Ok(form)
}

async fn read_value(field: &mut Field, key: &str, max_bytes: usize) -> Result<String, FormError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| FormError::Multipart(e.to_string()))?;
        if buf.len() + chunk.len() > max_bytes {
            return Err(FormError::TooLarge {
                field: key.to_string(),
                limit: max_bytes,
            });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(ensure_utf8(&buf))
}

async fn spool(
    field: &mut Field,
    key: &str,
    filename: String,
    content_type: Option<String>,
    max_bytes: usize,
) -> Result<Option<SpooledUpload>, FormError> {
    // browsers send an unnamed, empty part for an untouched file input
    if filename.is_empty() {
        drain(field).await?;
        return Ok(None);
    }

    let file = NamedTempFile::new()?;
    let mut out = tokio::fs::File::from_std(file.reopen()?);
    let mut written = 0usize;
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| FormError::Multipart(e.to_string()))?;
        written += chunk.len();
        if written > max_bytes {
            return Err(FormError::TooLarge {
                field: key.to_string(),
                limit: max_bytes,
            });
        }
        out.write_all(&chunk).await?;
    }
    out.flush().await?;

    info!(field = key, file = %filename, bytes = written, "upload spooled");
    Ok(Some(SpooledUpload {
        filename,
        content_type,
        file,
    }))
}

async fn drain(field: &mut Field) -> Result<(), FormError> {
    while let Some(chunk) = field.next().await {
        chunk.map_err(|e| FormError::Multipart(e.to_string()))?;
    }
    Ok(())
}
