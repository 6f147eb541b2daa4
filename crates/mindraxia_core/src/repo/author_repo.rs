//! Author persistence keyed by UUID and bearer-token hash.

use crate::model::author::{Author, AuthorId, AuthorRole};
use crate::repo::{conflict_on_unique, ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const AUTHOR_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    email,
    role,
    created_at
FROM authors";

pub trait AuthorRepository {
    /// Stores a new author; `token_hash` is never returned by reads.
    fn create_author(
        &self,
        name: &str,
        email: &str,
        role: AuthorRole,
        token_hash: &str,
    ) -> RepoResult<Author>;
    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>>;
    fn find_by_token_hash(&self, token_hash: &str) -> RepoResult<Option<Author>>;
    fn list_authors(&self) -> RepoResult<Vec<Author>>;
}

pub struct SqliteAuthorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAuthorRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn query_one(&self, clause: &str, value: &str) -> RepoResult<Option<Author>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AUTHOR_SELECT_SQL} WHERE {clause} = ?1;"))?;
        let mut rows = stmt.query([value])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_author_row(row)?));
        }
        Ok(None)
    }
}

impl AuthorRepository for SqliteAuthorRepository<'_> {
    fn create_author(
        &self,
        name: &str,
        email: &str,
        role: AuthorRole,
        token_hash: &str,
    ) -> RepoResult<Author> {
        let id = AuthorId::new_v4();
        self.conn
            .execute(
                "INSERT INTO authors (uuid, name, email, role, token_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![id.to_string(), name, email, role.as_str(), token_hash],
            )
            .map_err(|err| conflict_on_unique(err, || format!("author `{email}` already exists")))?;
        self.get_author(id)?
            .ok_or_else(|| RepoError::not_found("author", id))
    }

    fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>> {
        self.query_one("uuid", &id.to_string())
    }

    fn find_by_token_hash(&self, token_hash: &str) -> RepoResult<Option<Author>> {
        self.query_one("token_hash", token_hash)
    }

    fn list_authors(&self) -> RepoResult<Vec<Author>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{AUTHOR_SELECT_SQL} ORDER BY created_at ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut authors = Vec::new();
        while let Some(row) = rows.next()? {
            authors.push(parse_author_row(row)?);
        }
        Ok(authors)
    }
}

fn parse_author_row(row: &Row<'_>) -> RepoResult<Author> {
    let uuid_text: String = row.get("uuid")?;
    let role_text: String = row.get("role")?;
    let role = AuthorRole::parse(&role_text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid author role `{role_text}`")))?;
    Ok(Author {
        uuid: parse_uuid(&uuid_text, "authors.uuid")?,
        name: row.get("name")?,
        email: row.get("email")?,
        role,
        created_at: row.get("created_at")?,
    })
}
