use crate::auth::CurrentAuthor;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use mindraxia_core::model::author::Author;
use mindraxia_core::repo::author_repo::SqliteAuthorRepository;
use mindraxia_core::service::author_service::AuthorService;
use mindraxia_core::service::require_admin;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/authors", get(list_authors))
        .route("/authors/me", get(me))
}

async fn me(CurrentAuthor(author): CurrentAuthor) -> Json<Author> {
    Json(author)
}

async fn list_authors(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
) -> Result<Json<Vec<Author>>, ApiError> {
    require_admin(&actor)?;
    let authors = state.with_conn(|conn| {
        let service = AuthorService::new(SqliteAuthorRepository::try_new(conn)?);
        Ok(service.list_authors()?)
    })?;
    Ok(Json(authors))
}
