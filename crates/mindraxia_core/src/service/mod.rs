//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce authorization (admin vs editor, post ownership) so adapters
//!   stay thin.
//!
//! # Invariants
//! - Services never hold SQL; they only talk to repository traits.

pub mod author_service;
pub mod collection_service;
pub mod post_service;
pub mod route_service;
pub mod taxonomy_service;

use crate::model::author::Author;
use crate::model::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error shared by all services; adapters map it to their own status codes.
#[derive(Debug)]
pub enum ServiceError {
    /// Input rejected before persistence.
    Validation(ValidationError),
    /// Missing or unknown credentials.
    Unauthorized,
    /// Authenticated author lacks the required role or ownership.
    Forbidden(String),
    NotFound {
        entity: &'static str,
        id: String,
    },
    Conflict(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl ServiceError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Unauthorized => write!(f, "missing or invalid credentials"),
            Self::Forbidden(message) => write!(f, "forbidden: {message}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Conflict(message) => Self::Conflict(message),
            other => Self::Repo(other),
        }
    }
}

/// Rejects non-admin actors for admin-only resources.
pub fn require_admin(actor: &Author) -> ServiceResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "author {} is not an admin",
            actor.uuid
        )))
    }
}
