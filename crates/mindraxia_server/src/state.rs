//! Shared handler state.

use crate::config::SiteConfig;
use crate::error::ApiError;
use log::error;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// One SQLite connection shared by all handlers.
///
/// Access goes through [`AppState::with_conn`], which is synchronous, so the
/// lock is never held across an `.await`.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    site: Arc<SiteConfig>,
}

impl AppState {
    pub fn new(conn: Connection, site: SiteConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            site: Arc::new(site),
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let conn = self.db.lock().map_err(|_| {
            error!("event=db_lock module=server status=error error_code=lock_poisoned");
            ApiError::Internal("database unavailable".to_string())
        })?;
        f(&conn)
    }
}
