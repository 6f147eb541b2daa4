//! Post domain model.
//!
//! # Invariants
//! - `slug` is unique across posts.
//! - `published_at` is set the first time a post becomes `Published` and is
//!   kept when it returns to draft.
//! - A subcategory, when present, belongs to the post's category.

use super::author::AuthorId;
use super::taxonomy::{CategoryId, SubcategoryId};
use super::{optional_text, require_text, slug::resolve_slug, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PostId = Uuid;

const MAX_TITLE_CHARS: usize = 200;
const MAX_EXCERPT_CHARS: usize = 500;

/// Publication state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            _ => None,
        }
    }
}

/// Full post read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub uuid: PostId,
    pub title: String,
    pub slug: String,
    /// Raw markdown source.
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub author_uuid: AuthorId,
    pub category_uuid: Option<CategoryId>,
    pub subcategory_uuid: Option<SubcategoryId>,
    pub status: PostStatus,
    pub published_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Lowercase tag names sorted by name.
    pub tags: Vec<String>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            uuid: self.uuid,
            title: self.title.clone(),
            slug: self.slug.clone(),
            excerpt: self.excerpt.clone(),
            status: self.status,
        }
    }
}

/// Compact projection used inside routes, collections and related lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uuid: PostId,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub status: PostStatus,
}

/// Create/update input for posts. Update uses full replacement semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDraft {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub category_uuid: Option<CategoryId>,
    #[serde(default)]
    pub subcategory_uuid: Option<SubcategoryId>,
    #[serde(default)]
    pub status: PostStatus,
    /// `None` leaves tags untouched on update.
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// Validated post fields ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFields {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub cover_image: Option<String>,
    pub category_uuid: Option<CategoryId>,
    pub subcategory_uuid: Option<SubcategoryId>,
    pub status: PostStatus,
}

impl PostDraft {
    pub fn validate(&self) -> Result<PostFields, ValidationError> {
        let title = require_text("title", &self.title, MAX_TITLE_CHARS)?;
        let slug = resolve_slug(self.slug.as_deref(), &title)?;
        let excerpt = optional_text(self.excerpt.as_deref());
        if excerpt
            .as_ref()
            .is_some_and(|value| value.chars().count() > MAX_EXCERPT_CHARS)
        {
            return Err(ValidationError::TooLong {
                field: "excerpt",
                max: MAX_EXCERPT_CHARS,
            });
        }
        if self.subcategory_uuid.is_some() && self.category_uuid.is_none() {
            return Err(ValidationError::Inconsistent(
                "subcategory requires a category".to_string(),
            ));
        }

        Ok(PostFields {
            title,
            slug,
            content: self.content.clone(),
            excerpt,
            cover_image: optional_text(self.cover_image.as_deref()),
            category_uuid: self.category_uuid,
            subcategory_uuid: self.subcategory_uuid,
            status: self.status,
        })
    }
}
