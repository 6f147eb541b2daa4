//! HTTP server for Mindraxia.
//!
//! # Responsibility
//! - Expose the core services as a JSON API under `/api`.
//! - Serve published posts as HTML pages under `/posts/{slug}`.
//! - Own configuration loading and request logging.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod pages;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use state::AppState;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use log::{info, warn};
use mindraxia_core::{core_version, open_db, DbError};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Db(DbError),
    Io(std::io::Error),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "server I/O failed: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DbError> for ServerError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api::routes())
        .merge(pages::routes())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Opens the database and serves until Ctrl-C.
pub async fn serve(config: &Config) -> Result<(), ServerError> {
    let addr = config.bind_addr()?;
    let conn = open_db(&config.database.path)?;
    let state = AppState::new(conn, config.site.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("event=server_start module=server status=ok bind={addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": core_version() }))
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status().as_u16();
    let duration_ms = started_at.elapsed().as_millis();
    if response.status().is_server_error() {
        warn!(
            "event=http_request module=server status=error method={method} path={path} http_status={status} duration_ms={duration_ms}"
        );
    } else {
        info!(
            "event=http_request module=server status=ok method={method} path={path} http_status={status} duration_ms={duration_ms}"
        );
    }
    response
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=server_shutdown module=server status=error error={err}");
    }
}
