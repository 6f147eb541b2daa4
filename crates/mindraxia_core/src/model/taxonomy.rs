//! Categories, subcategories and tags.

use super::{optional_text, require_text, slug::resolve_slug, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CategoryId = Uuid;
pub type SubcategoryId = Uuid;
pub type TagId = i64;

const MAX_NAME_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub uuid: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub uuid: SubcategoryId,
    pub category_uuid: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Category together with its subcategories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub subcategories: Vec<Subcategory>,
}

/// Tag with the number of posts currently carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub post_count: i64,
}

/// Create/update input shared by categories and subcategories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Validated form of [`CategoryDraft`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFields {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

impl CategoryDraft {
    pub fn validate(&self) -> Result<CategoryFields, ValidationError> {
        let name = require_text("name", &self.name, MAX_NAME_CHARS)?;
        let slug = resolve_slug(self.slug.as_deref(), &name)?;
        Ok(CategoryFields {
            slug,
            name,
            description: optional_text(self.description.as_deref()),
        })
    }
}
