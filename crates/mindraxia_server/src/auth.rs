//! Bearer-token authentication extractors.
//!
//! - [`CurrentAuthor`] rejects requests without a valid token (401).
//! - [`MaybeAuthor`] lets anonymous requests through, but a token that is
//!   present and invalid is still a 401.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use mindraxia_core::model::author::Author;
use mindraxia_core::repo::author_repo::SqliteAuthorRepository;
use mindraxia_core::service::author_service::AuthorService;

const BEARER_PREFIX: &str = "Bearer ";

pub struct CurrentAuthor(pub Author);

pub struct MaybeAuthor(pub Option<Author>);

impl FromRequestParts<AppState> for CurrentAuthor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        authenticate(state, token).map(Self)
    }
}

impl FromRequestParts<AppState> for MaybeAuthor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => authenticate(state, token).map(|author| Self(Some(author))),
            None => Ok(Self(None)),
        }
    }
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed authorization header".to_string()))?;
    value
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Some)
        .ok_or_else(|| {
            ApiError::Unauthorized("expected `Authorization: Bearer <token>`".to_string())
        })
}

fn authenticate(state: &AppState, token: &str) -> Result<Author, ApiError> {
    state.with_conn(|conn| {
        let service = AuthorService::new(SqliteAuthorRepository::try_new(conn)?);
        Ok(service.authenticate(token)?)
    })
}
