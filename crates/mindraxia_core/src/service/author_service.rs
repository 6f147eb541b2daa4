//! Author provisioning and bearer-token authentication.
//!
//! # Invariants
//! - Plain tokens are returned once at registration and never stored; only
//!   their blake3 hash is persisted.

use crate::model::author::{Author, AuthorId, AuthorRole};
use crate::model::{require_text, ValidationError};
use crate::repo::author_repo::AuthorRepository;
use crate::service::{ServiceError, ServiceResult};
use log::info;
use uuid::Uuid;

const TOKEN_PREFIX: &str = "mdx_";
const MAX_NAME_CHARS: usize = 120;
const MAX_EMAIL_CHARS: usize = 254;

/// Newly registered author plus the one-time plain token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredentials {
    pub author: Author,
    pub token: String,
}

pub struct AuthorService<R: AuthorRepository> {
    repo: R,
}

impl<R: AuthorRepository> AuthorService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers an author and issues their bearer token.
    pub fn register_author(
        &self,
        name: &str,
        email: &str,
        role: AuthorRole,
    ) -> ServiceResult<IssuedCredentials> {
        let name = require_text("name", name, MAX_NAME_CHARS)?;
        let email = require_text("email", email, MAX_EMAIL_CHARS)?;
        if !looks_like_email(&email) {
            return Err(ValidationError::Inconsistent(format!("invalid email `{email}`")).into());
        }

        let token = generate_token();
        let author = self
            .repo
            .create_author(&name, &email, role, &hash_token(&token))?;
        info!(
            "event=author_register module=service status=ok author_uuid={} role={}",
            author.uuid,
            role.as_str()
        );
        Ok(IssuedCredentials { author, token })
    }

    /// Resolves a bearer token to its author.
    pub fn authenticate(&self, token: &str) -> ServiceResult<Author> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ServiceError::Unauthorized);
        }
        self.repo
            .find_by_token_hash(&hash_token(token))?
            .ok_or(ServiceError::Unauthorized)
    }

    pub fn get_author(&self, id: AuthorId) -> ServiceResult<Author> {
        self.repo
            .get_author(id)?
            .ok_or_else(|| ServiceError::not_found("author", id))
    }

    pub fn list_authors(&self) -> ServiceResult<Vec<Author>> {
        Ok(self.repo.list_authors()?)
    }
}

/// Hex-encoded blake3 digest stored in place of the token.
pub fn hash_token(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

fn generate_token() -> String {
    format!(
        "{TOKEN_PREFIX}{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{generate_token, hash_token, looks_like_email};

    #[test]
    fn tokens_are_unique_and_hash_deterministically() {
        let first = generate_token();
        let second = generate_token();
        assert_ne!(first, second);
        assert!(first.starts_with("mdx_"));
        assert_eq!(hash_token(&first), hash_token(&first));
        assert_eq!(hash_token(&first).len(), 64);
    }

    #[test]
    fn email_shape_check() {
        assert!(looks_like_email("ada@example.org"));
        assert!(!looks_like_email("ada.example.org"));
        assert!(!looks_like_email("@example.org"));
        assert!(!looks_like_email("ada @example.org"));
    }
}
