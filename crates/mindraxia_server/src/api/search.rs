use crate::auth::MaybeAuthor;
use crate::error::ApiError;
use crate::extract::ApiQuery;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use mindraxia_core::model::taxonomy::CategoryId;
use mindraxia_core::{search_posts, SearchHit, SearchQuery};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub category: Option<CategoryId>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SearchBody {
    pub query: String,
    pub items: Vec<SearchHit>,
}

/// Drafts are searchable only with a valid token.
async fn search(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<SearchBody>, ApiError> {
    let mut query = SearchQuery::new(params.q.as_str());
    query.category = params.category;
    query.include_drafts = viewer.is_some();
    if let Some(limit) = params.limit {
        query.limit = limit;
    }

    let items = state.with_conn(|conn| Ok(search_posts(conn, &query)?))?;
    Ok(Json(SearchBody {
        query: params.q,
        items,
    }))
}
