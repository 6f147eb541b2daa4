//! Author accounts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type AuthorId = Uuid;

/// Authorization role of an author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    /// Manages every resource.
    Admin,
    /// Writes and maintains their own posts.
    Editor,
}

impl AuthorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "editor" => Some(Self::Editor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub uuid: AuthorId,
    pub name: String,
    pub email: String,
    pub role: AuthorRole,
    pub created_at: i64,
}

impl Author {
    pub fn is_admin(&self) -> bool {
        self.role == AuthorRole::Admin
    }

    /// Admins edit everything; editors only posts they wrote.
    pub fn can_edit_post(&self, post_author: AuthorId) -> bool {
        self.is_admin() || self.uuid == post_author
    }
}
