use reqwest::Client;
use tracing::{debug, error, warn};
use url::Url;

use crate::dto::{CompareRequest, ComparisonResult};

#[derive(thiserror::Error, Debug)]
pub enum CompareError {
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP {0}")]
    Http(u16),
    #[error("parse error: {0}")]
    Parse(serde_json::Error),
}

/// Client for the plagiarism backend.
///
/// Every call to [`CompareClient::compare`] issues exactly one `POST`: no
/// retries, no caching and no timeout beyond the transport defaults.
#[derive(Debug, Clone)]
pub struct CompareClient {
    http: Client,
    endpoint: Url,
}

impl CompareClient {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn from_url_str(endpoint: &str) -> Result<Self, CompareError> {
        let url = Url::parse(endpoint).map_err(|e| CompareError::Endpoint(e.to_string()))?;
        Ok(Self::new(url))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send both texts to the backend and parse its verdict.
    ///
    /// Non-2xx answers map to [`CompareError::Http`], an unparsable body or
    /// one lacking `similarity`/`is_plagiarism` to [`CompareError::Parse`].
    pub async fn compare(&self, req: &CompareRequest) -> Result<ComparisonResult, CompareError> {
        debug!(
            endpoint = %self.endpoint,
            analyzer = %req.analyzer,
            ngram_min = req.ngram_range.0,
            ngram_max = req.ngram_range.1,
            len_a = req.text_a.len(),
            len_b = req.text_b.len(),
            "\u{2192} compare request"
        );
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(req)
            .send()
            .await
            .map_err(|e| {
                error!(endpoint = %self.endpoint, "network error to plagiarism API: {e}");
                CompareError::Network(e.to_string())
            })?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| CompareError::Network(e.to_string()))?;
        debug!(
            status = %status,
            "\u{2190} body = {}",
            String::from_utf8_lossy(&bytes[..bytes.len().min(1024)])
        );

        if !status.is_success() {
            return Err(CompareError::Http(status.as_u16()));
        }

        serde_json::from_slice(&bytes).map_err(CompareError::Parse)
    }

    /// Query the backend's `/health` route on the endpoint's origin.
    pub async fn health(&self) -> bool {
        let url = match self.endpoint.join("/health") {
            Ok(u) => u,
            Err(e) => {
                warn!(%e, "cannot derive health url");
                return false;
            }
        };
        match self.http.get(url.clone()).send().await {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(%url, status = %resp.status(), "backend health check failed");
                false
            }
            Err(e) => {
                warn!(%url, "backend health check network error: {e}");
                false
            }
        }
    }
}
