use actix_web::cookie::Key;
use shared::compare_client::CompareClient;
use shared::config::Settings;
use shared::error::{AppError, Result};
use tracing::warn;

use crate::views::Views;

/// Minimum amount of key material accepted in `SECRET_KEY_BASE`.
const MIN_SECRET_BYTES: usize = 32;

pub struct AppState {
    pub client: CompareClient,
    pub views: Views,
    pub cookie_key: Key,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(client: CompareClient, views: Views, cookie_key: Key, max_upload_bytes: usize) -> Self {
        Self {
            client,
            views,
            cookie_key,
            max_upload_bytes,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = CompareClient::new(settings.api_url()?);
        let views = Views::new().map_err(|e| AppError::Config(format!("templates: {e}")))?;
        let cookie_key = cookie_key(settings.secret_key_base.as_deref())?;
        Ok(Self::new(client, views, cookie_key, settings.max_upload_bytes))
    }
}

fn cookie_key(secret: Option<&str>) -> Result<Key> {
    match secret.map(str::trim).filter(|s| !s.is_empty()) {
        None => {
            warn!("SECRET_KEY_BASE not set, using a random session key; sessions end on restart");
            Ok(Key::generate())
        }
        Some(s) if s.len() < MIN_SECRET_BYTES => Err(AppError::Config(format!(
            "SECRET_KEY_BASE must be at least {MIN_SECRET_BYTES} bytes"
        ))),
        Some(s) => Ok(Key::derive_from(s.as_bytes())),
    }
}
