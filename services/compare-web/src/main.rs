//! Web front end that submits two texts to the plagiarism backend and renders
//! its verdict.

mod forms;
mod handlers;
mod hosts;
mod session;
mod state;
mod views;

use actix_web::middleware::{from_fn, Logger};
use actix_web::{web, App, HttpServer};
use shared::config::Settings;
use shared::error::AppError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::hosts::{host_authorization, AllowedHosts};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // JSON-Logger
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::new().map_err(AppError::from) {
        Ok(s) => s,
        Err(e) => {
            error!(%e, "failed to load settings");
            std::process::exit(1);
        }
    };

    let state = match AppState::from_settings(&settings) {
        Ok(s) => web::Data::new(s),
        Err(e) => {
            error!(%e, "invalid configuration");
            std::process::exit(1);
        }
    };
    let allowed_hosts = settings.allowed_hosts();
    if allowed_hosts.is_empty() {
        info!("ALLOWED_HOSTS empty, accepting every host");
    }
    let hosts = web::Data::new(AllowedHosts::new(allowed_hosts));

    info!(
        api = %state.client.endpoint(),
        host = %settings.host,
        port = settings.port,
        "starting compare-web"
    );
    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(hosts.clone())
            .wrap(from_fn(host_authorization))
            .wrap(Logger::default())
            .configure(handlers::configure)
    });
    if settings.web_concurrency > 0 {
        server = server.workers(settings.web_concurrency);
    }
    server
        .bind((settings.host.as_str(), settings.port))?
        .run()
        .await
}
