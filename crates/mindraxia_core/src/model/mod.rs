//! Domain model for posts, taxonomy, reading routes and collections.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own input validation shared by services and repositories.
//!
//! # Invariants
//! - Every row-backed object is identified by a stable UUID (tags use an
//!   integer id).
//! - Slugs are lowercase ASCII words joined by single dashes.

pub mod anchor;
pub mod author;
pub mod collection;
pub mod post;
pub mod route;
pub mod slug;
pub mod taxonomy;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Input validation failure raised before any persistence happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Slug does not match `^[a-z0-9]+(-[a-z0-9]+)*$`.
    InvalidSlug(String),
    /// No slug could be derived from the given title/name.
    UnsluggableTitle(String),
    /// Field exceeds its maximum length in characters.
    TooLong { field: &'static str, max: usize },
    /// Cross-field consistency failure.
    Inconsistent(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::InvalidSlug(slug) => write!(
                f,
                "invalid slug `{slug}`; expected lowercase letters, digits and single dashes"
            ),
            Self::UnsluggableTitle(title) => {
                write!(f, "cannot derive a slug from `{title}`; provide one explicitly")
            }
            Self::TooLong { field, max } => {
                write!(f, "`{field}` must be at most {max} characters")
            }
            Self::Inconsistent(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects blank or over-long input.
pub fn require_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(trimmed.to_string())
}

/// Trims optional text, mapping blank input to `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
