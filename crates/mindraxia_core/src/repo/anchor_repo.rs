//! Persisted anchor index used to resolve cross-post references.
//!
//! # Responsibility
//! - Replace the anchor set of a post after its content changes.
//! - Answer `(post slug, kind, id)` lookups for the renderer.
//!
//! # Invariants
//! - A post's anchor set is replaced atomically, never merged.
//! - Lookups ignore draft posts unless the repository was built with
//!   [`SqliteAnchorRepository::with_drafts`].

use crate::markdown::AnchorLookup;
use crate::model::anchor::{AnchorKind, AnchorRecord};
use crate::model::post::PostId;
use crate::repo::{ensure_schema_ready, RepoError, RepoResult};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

pub trait AnchorRepository {
    /// Replaces every anchor stored for `post`.
    fn replace_post_anchors(&self, post: PostId, anchors: &[AnchorRecord]) -> RepoResult<()>;
    fn list_post_anchors(&self, post: PostId) -> RepoResult<Vec<AnchorRecord>>;
    fn find_anchor(
        &self,
        post_slug: &str,
        kind: AnchorKind,
        anchor_id: &str,
    ) -> RepoResult<Option<AnchorRecord>>;
}

pub struct SqliteAnchorRepository<'conn> {
    conn: &'conn Connection,
    include_drafts: bool,
}

impl<'conn> SqliteAnchorRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self {
            conn,
            include_drafts: false,
        })
    }

    /// Lets lookups see anchors of unpublished posts (admin previews).
    pub fn with_drafts(mut self) -> Self {
        self.include_drafts = true;
        self
    }
}

impl AnchorRepository for SqliteAnchorRepository<'_> {
    fn replace_post_anchors(&self, post: PostId, anchors: &[AnchorRecord]) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let post_uuid = post.to_string();

        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM posts WHERE uuid = ?1;",
                [post_uuid.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(RepoError::not_found("post", post));
        }

        tx.execute(
            "DELETE FROM post_anchors WHERE post_uuid = ?1;",
            [post_uuid.as_str()],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO post_anchors
                    (post_uuid, kind, anchor_id, number, title, content)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            )?;
            for anchor in anchors {
                insert.execute(params![
                    post_uuid,
                    anchor.kind.prefix(),
                    anchor.anchor_id,
                    anchor.number,
                    anchor.title,
                    anchor.content,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn list_post_anchors(&self, post: PostId) -> RepoResult<Vec<AnchorRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, anchor_id, number, title, content
             FROM post_anchors
             WHERE post_uuid = ?1
             ORDER BY kind ASC, number ASC;",
        )?;
        let mut rows = stmt.query([post.to_string()])?;
        let mut anchors = Vec::new();
        while let Some(row) = rows.next()? {
            anchors.push(parse_anchor_row(row)?);
        }
        Ok(anchors)
    }

    fn find_anchor(
        &self,
        post_slug: &str,
        kind: AnchorKind,
        anchor_id: &str,
    ) -> RepoResult<Option<AnchorRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.kind AS kind, a.anchor_id AS anchor_id, a.number AS number,
                    a.title AS title, a.content AS content
             FROM post_anchors a
             JOIN posts p ON p.uuid = a.post_uuid
             WHERE p.slug = ?1
               AND a.kind = ?2
               AND a.anchor_id = ?3
               AND (?4 = 1 OR p.status = 'published');",
        )?;
        let mut rows = stmt.query(params![
            post_slug,
            kind.prefix(),
            anchor_id,
            self.include_drafts as i64
        ])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_anchor_row(row)?));
        }
        Ok(None)
    }
}

impl AnchorLookup for SqliteAnchorRepository<'_> {
    fn lookup(&self, post_slug: &str, kind: AnchorKind, anchor_id: &str) -> Option<AnchorRecord> {
        match self.find_anchor(post_slug, kind, anchor_id) {
            Ok(found) => found,
            Err(err) => {
                warn!(
                    "event=anchor_lookup module=repo status=error post_slug={post_slug} kind={} anchor_id={anchor_id} error={err}",
                    kind.prefix()
                );
                None
            }
        }
    }
}

fn parse_anchor_row(row: &Row<'_>) -> RepoResult<AnchorRecord> {
    let kind_text: String = row.get("kind")?;
    let kind = AnchorKind::from_prefix(&kind_text)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid anchor kind `{kind_text}`")))?;
    Ok(AnchorRecord {
        kind,
        anchor_id: row.get("anchor_id")?,
        number: row.get("number")?,
        title: row.get("title")?,
        content: row.get("content")?,
    })
}
