//! SQLite FTS5-based post search.
//!
//! # Responsibility
//! - Provide keyword search over post titles and markdown content.
//! - Return typed hits with stable IDs and highlighted snippets.
//!
//! # Invariants
//! - Drafts are only returned when the query opts in.
//! - Result ordering is deterministic by rank, publication time and uuid.

use crate::db::DbError;
use crate::model::post::{PostId, PostStatus};
use crate::model::taxonomy::CategoryId;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type for search APIs.
pub type SearchResult<T> = Result<T, SearchError>;

/// Search-layer error for query parsing, DB interaction and result decoding.
#[derive(Debug)]
pub enum SearchError {
    /// User-provided query cannot be parsed by FTS5 syntax.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

const SEARCH_DEFAULT_LIMIT: u32 = 20;
const SEARCH_LIMIT_MAX: u32 = 100;

/// Search options for full-text query behavior.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// User query text.
    pub text: String,
    /// Optional category filter.
    pub category: Option<CategoryId>,
    /// Includes draft posts (authenticated callers only).
    pub include_drafts: bool,
    /// Maximum number of hits to return; capped at 100.
    pub limit: u32,
    /// Whether to pass text directly as raw FTS5 expression.
    ///
    /// Default is `false` to protect type-as-you-search UX from syntax errors.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    /// Creates a published-only query with default pagination.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: None,
            include_drafts: false,
            limit: SEARCH_DEFAULT_LIMIT,
            raw_fts_syntax: false,
        }
    }
}

/// Single search hit returned by [`search_posts`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub post_uuid: PostId,
    pub title: String,
    pub slug: String,
    pub status: PostStatus,
    /// Matched fragment with hits wrapped in `[` `]`.
    pub snippet: String,
}

/// Searches posts via FTS5 and returns ranked results.
///
/// Returns an empty list for blank queries.
pub fn search_posts(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query)? else {
        return Ok(Vec::new());
    };

    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            posts.uuid AS uuid,
            posts.title AS title,
            posts.slug AS slug,
            posts.status AS status,
            snippet(posts_fts, -1, '[', ']', ' ... ', 10) AS snippet
         FROM posts_fts
         JOIN posts ON posts.uuid = posts_fts.post_uuid
         WHERE posts_fts MATCH ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if !query.include_drafts {
        sql.push_str(" AND posts.status = 'published'");
    }
    if let Some(category) = query.category {
        sql.push_str(" AND posts.category_uuid = ?");
        bind_values.push(Value::Text(category.to_string()));
    }

    sql.push_str(
        " ORDER BY bm25(posts_fts),
            COALESCE(posts.published_at, posts.created_at) DESC,
            posts.uuid ASC
          LIMIT ?",
    );
    bind_values.push(Value::Integer(i64::from(query.limit.min(SEARCH_LIMIT_MAX))));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();

    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row)?);
    }

    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let uuid_text: String = row.get("uuid")?;
    let post_uuid = Uuid::parse_str(&uuid_text)
        .map_err(|_| SearchError::InvalidData(format!("invalid uuid `{uuid_text}`")))?;

    let status_text: String = row.get("status")?;
    let status = PostStatus::parse(&status_text)
        .ok_or_else(|| SearchError::InvalidData(format!("invalid status `{status_text}`")))?;

    Ok(SearchHit {
        post_uuid,
        title: row.get("title")?,
        slug: row.get("slug")?,
        status,
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &SearchQuery) -> SearchResult<Option<String>> {
    let text = query.text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if query.raw_fts_syntax {
        return Ok(Some(text.to_string()));
    }

    let terms = text
        .split_whitespace()
        .filter(|term| !term.is_empty())
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return Ok(None);
    }

    Ok(Some(terms.join(" AND ")))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }

    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
