//! Host header authorization driven by `ALLOWED_HOSTS`.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::middleware::Next;
use actix_web::{web, Error, HttpResponse};
use tracing::warn;

/// Accepted host names. Empty allows every host; an entry starting with a
/// dot also matches all of its subdomains.
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts(Vec<String>);

impl AllowedHosts {
    pub fn new(hosts: Vec<String>) -> Self {
        Self(hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect())
    }

    pub fn permits(&self, host_header: &str) -> bool {
        if self.0.is_empty() {
            return true;
        }
        let host = strip_port(host_header).to_ascii_lowercase();
        self.0.iter().any(|allowed| match allowed.strip_prefix('.') {
            Some(domain) => host == domain || host.ends_with(allowed.as_str()),
            None => host == *allowed,
        })
    }

    /// Checks the real `Host` (or the HTTP/2 authority) and, when present,
    /// every entry of `X-Forwarded-Host`. Returns the first rejected host.
    pub fn authorize(&self, host: Option<&str>, forwarded: Option<&str>) -> Result<(), String> {
        if self.0.is_empty() {
            return Ok(());
        }
        let host = host.map(str::trim).unwrap_or_default();
        if host.is_empty() || !self.permits(host) {
            return Err(host.to_string());
        }
        for fwd in forwarded.into_iter().flat_map(|v| v.split(',')).map(str::trim) {
            if !self.permits(fwd) {
                return Err(fwd.to_string());
            }
        }
        Ok(())
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // IPv6 literal, e.g. [::1]:3000
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

pub async fn host_authorization<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let verdict = match req.app_data::<web::Data<AllowedHosts>>() {
        Some(hosts) => {
            let host = req
                .headers()
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .or_else(|| req.uri().authority().map(|a| a.as_str()));
            // undecodable values cannot match any listed host
            let forwarded = req
                .headers()
                .get("x-forwarded-host")
                .map(|v| v.to_str().unwrap_or("\u{fffd}"));
            hosts.authorize(host, forwarded)
        }
        None => Ok(()),
    };
    if let Err(host) = verdict {
        warn!(%host, "blocked request for unlisted host");
        let resp = HttpResponse::Forbidden().body(format!("Blocked host: {host}"));
        return Ok(req.into_response(resp).map_into_right_body());
    }
    next.call(req).await.map(ServiceResponse::map_into_left_body)
}
