//! Core domain logic for Mindraxia.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use markdown::{
    derive_markdown_preview, extract_anchors, AnchorLookup, NoAnchorLookup, RenderedDocument,
    Renderer,
};
pub use repo::{RepoError, RepoResult};
pub use search::fts::{search_posts, SearchError, SearchHit, SearchQuery, SearchResult};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
