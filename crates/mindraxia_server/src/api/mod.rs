//! JSON API under `/api`.
//!
//! Handlers borrow the shared connection through [`AppState::with_conn`],
//! build the core service they need and map its errors with [`ApiError`].

mod authors;
mod collections;
mod posts;
mod routes;
mod search;
mod taxonomy;

use crate::error::ApiError;
use crate::state::AppState;
use axum::Router;
use mindraxia_core::model::author::Author;
use mindraxia_core::repo::anchor_repo::SqliteAnchorRepository;
use mindraxia_core::repo::post_repo::SqlitePostRepository;
use mindraxia_core::service::post_service::PostService;
use rusqlite::Connection;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(posts::routes())
        .merge(taxonomy::routes())
        .merge(routes::routes())
        .merge(collections::routes())
        .merge(search::routes())
        .merge(authors::routes())
}

/// Post service whose cross-post lookups see drafts only for authors.
pub(crate) fn post_service<'conn>(
    conn: &'conn Connection,
    viewer: Option<&Author>,
) -> Result<PostService<SqlitePostRepository<'conn>, SqliteAnchorRepository<'conn>>, ApiError> {
    let anchors = SqliteAnchorRepository::try_new(conn)?;
    let anchors = if viewer.is_some() {
        anchors.with_drafts()
    } else {
        anchors
    };
    Ok(PostService::new(SqlitePostRepository::try_new(conn)?, anchors))
}
