//! Collections: unordered named groupings of posts.

use super::post::{PostId, PostSummary};
use super::{optional_text, require_text, slug::resolve_slug, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CollectionId = Uuid;

const MAX_NAME_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub uuid: CollectionId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub item_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItem {
    pub collection_uuid: CollectionId,
    /// Per-item note shown next to the post.
    pub description: Option<String>,
    pub added_at: i64,
    pub post: PostSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDraft {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFields {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl CollectionDraft {
    pub fn validate(&self) -> Result<CollectionFields, ValidationError> {
        let name = require_text("name", &self.name, MAX_NAME_CHARS)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;
        Ok(CollectionFields {
            slug,
            name,
            description: optional_text(self.description.as_deref()),
        })
    }
}

/// Request to add a post to a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItemDraft {
    pub post_uuid: PostId,
    #[serde(default)]
    pub description: Option<String>,
}

/// Replacement of a collection item's description; blank clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionItemUpdate {
    #[serde(default)]
    pub description: Option<String>,
}
