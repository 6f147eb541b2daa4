//! Reading routes: ordered sequences of posts.
//!
//! # Invariants
//! - Item positions within one route are contiguous, starting at 0.
//! - A post appears at most once per route.

use super::post::{PostId, PostSummary};
use super::{optional_text, require_text, slug::resolve_slug, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type RouteId = Uuid;
pub type RouteItemId = Uuid;

const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub uuid: RouteId,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub item_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteItem {
    pub uuid: RouteItemId,
    pub route_uuid: RouteId,
    pub position: i64,
    pub note: Option<String>,
    pub post: PostSummary,
}

/// Previous/next posts around one post of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNeighbors {
    pub route_uuid: RouteId,
    pub position: i64,
    pub total: usize,
    pub previous: Option<PostSummary>,
    pub next: Option<PostSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDraft {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFields {
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
}

impl RouteDraft {
    pub fn validate(&self) -> Result<RouteFields, ValidationError> {
        let title = require_text("title", &self.title, MAX_TITLE_CHARS)?;
        let slug = resolve_slug(self.slug.as_deref(), &title)?;
        Ok(RouteFields {
            slug,
            title,
            description: optional_text(self.description.as_deref()),
        })
    }
}

/// Request to add a post to a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteItemDraft {
    pub post_uuid: PostId,
    /// Target index; `None` appends. Out-of-range values are clamped.
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Partial update of a route item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteItemUpdate {
    /// Moves the item when present (clamped to the route length).
    #[serde(default)]
    pub position: Option<i64>,
    /// Replaces the note when present; blank clears it.
    #[serde(default)]
    pub note: Option<String>,
}
