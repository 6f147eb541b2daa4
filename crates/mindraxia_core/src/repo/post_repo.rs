//! Post repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `posts` plus tag and related-post links.
//! - Own tag-link replacement logic with atomic semantics.
//!
//! # Invariants
//! - `set_post_tags` replaces the whole tag set in a single transaction.
//! - Tag names are normalized to lowercase before persistence.
//! - Deleting a post compacts the positions of every route it belonged to.

use crate::model::author::AuthorId;
use crate::model::post::{Post, PostFields, PostId, PostStatus, PostSummary};
use crate::model::slug::slugify;
use crate::model::taxonomy::{CategoryId, SubcategoryId};
use crate::repo::route_repo::renumber_route;
use crate::repo::{
    clamp_limit, conflict_on_unique, ensure_schema_ready, parse_optional_uuid, parse_uuid,
    RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::BTreeSet;

const POSTS_DEFAULT_LIMIT: u32 = 20;
const POSTS_LIMIT_MAX: u32 = 100;

const POST_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    slug,
    content,
    excerpt,
    cover_image,
    author_uuid,
    category_uuid,
    subcategory_uuid,
    status,
    published_at,
    created_at,
    updated_at
FROM posts";

/// Column list for joining a post summary under alias `p`.
pub(crate) const POST_SUMMARY_COLUMNS: &str = "p.uuid AS post_uuid,
    p.title AS post_title,
    p.slug AS post_slug,
    p.excerpt AS post_excerpt,
    p.status AS post_status";

/// Query options for listing posts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostListQuery {
    pub status: Option<PostStatus>,
    pub category: Option<CategoryId>,
    pub subcategory: Option<SubcategoryId>,
    /// Single-tag exact match filter (case-insensitive).
    pub tag: Option<String>,
    pub author: Option<AuthorId>,
    /// Defaults to 20 and clamps to 100.
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for post operations.
pub trait PostRepository {
    fn create_post(&self, author: AuthorId, fields: &PostFields) -> RepoResult<PostId>;
    /// Full replacement of editable fields.
    fn update_post(&self, id: PostId, fields: &PostFields) -> RepoResult<()>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>>;
    fn get_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>>;
    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Vec<Post>>;
    fn delete_post(&self, id: PostId) -> RepoResult<()>;
    /// Replaces all tags for the given post in one transaction.
    fn set_post_tags(&self, id: PostId, tags: &[String]) -> RepoResult<()>;
    fn add_related(&self, id: PostId, related: PostId) -> RepoResult<()>;
    fn remove_related(&self, id: PostId, related: PostId) -> RepoResult<()>;
    fn list_related(&self, id: PostId, published_only: bool) -> RepoResult<Vec<PostSummary>>;
    fn category_exists(&self, id: CategoryId) -> RepoResult<bool>;
    /// Returns the owning category of a subcategory, if it exists.
    fn subcategory_parent(&self, id: SubcategoryId) -> RepoResult<Option<CategoryId>>;
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PostRepository for SqlitePostRepository<'_> {
    fn create_post(&self, author: AuthorId, fields: &PostFields) -> RepoResult<PostId> {
        let id = PostId::new_v4();
        self.conn
            .execute(
                "INSERT INTO posts (
                    uuid,
                    title,
                    slug,
                    content,
                    excerpt,
                    cover_image,
                    author_uuid,
                    category_uuid,
                    subcategory_uuid,
                    status,
                    published_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                    CASE WHEN ?10 = 'published' THEN (strftime('%s', 'now') * 1000) ELSE NULL END
                );",
                params![
                    id.to_string(),
                    fields.title,
                    fields.slug,
                    fields.content,
                    fields.excerpt,
                    fields.cover_image,
                    author.to_string(),
                    fields.category_uuid.map(|value| value.to_string()),
                    fields.subcategory_uuid.map(|value| value.to_string()),
                    fields.status.as_str(),
                ],
            )
            .map_err(|err| {
                conflict_on_unique(err, || format!("post slug `{}` already exists", fields.slug))
            })?;
        Ok(id)
    }

    fn update_post(&self, id: PostId, fields: &PostFields) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE posts
                 SET
                    title = ?2,
                    slug = ?3,
                    content = ?4,
                    excerpt = ?5,
                    cover_image = ?6,
                    category_uuid = ?7,
                    subcategory_uuid = ?8,
                    status = ?9,
                    published_at = CASE
                        WHEN ?9 = 'published' AND published_at IS NULL
                            THEN (strftime('%s', 'now') * 1000)
                        ELSE published_at
                    END,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![
                    id.to_string(),
                    fields.title,
                    fields.slug,
                    fields.content,
                    fields.excerpt,
                    fields.cover_image,
                    fields.category_uuid.map(|value| value.to_string()),
                    fields.subcategory_uuid.map(|value| value.to_string()),
                    fields.status.as_str(),
                ],
            )
            .map_err(|err| {
                conflict_on_unique(err, || format!("post slug `{}` already exists", fields.slug))
            })?;

        if changed == 0 {
            return Err(RepoError::not_found("post", id));
        }
        Ok(())
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<Post>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_post_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn get_post_by_slug(&self, slug: &str) -> RepoResult<Option<Post>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_post_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_posts(&self, query: &PostListQuery) -> RepoResult<Vec<Post>> {
        let mut sql = format!("{POST_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(category) = query.category {
            sql.push_str(" AND category_uuid = ?");
            bind_values.push(Value::Text(category.to_string()));
        }
        if let Some(subcategory) = query.subcategory {
            sql.push_str(" AND subcategory_uuid = ?");
            bind_values.push(Value::Text(subcategory.to_string()));
        }
        if let Some(author) = query.author {
            sql.push_str(" AND author_uuid = ?");
            bind_values.push(Value::Text(author.to_string()));
        }
        if let Some(tag) = query.tag.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM post_tags pt
                    INNER JOIN tags t ON t.id = pt.tag_id
                    WHERE pt.post_uuid = posts.uuid
                      AND t.name = ? COLLATE NOCASE
                )",
            );
            bind_values.push(Value::Text(tag.clone()));
        }

        sql.push_str(" ORDER BY COALESCE(published_at, created_at) DESC, uuid ASC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(normalize_post_limit(query.limit))));
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(self.conn, row)?);
        }
        Ok(posts)
    }

    fn delete_post(&self, id: PostId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let route_ids = {
            let mut stmt =
                tx.prepare("SELECT DISTINCT route_uuid FROM route_items WHERE post_uuid = ?1;")?;
            let mut rows = stmt.query([id.to_string()])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                ids.push(parse_uuid(&value, "route_items.route_uuid")?);
            }
            ids
        };

        let changed = tx.execute("DELETE FROM posts WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("post", id));
        }

        for route_id in route_ids {
            renumber_route(&tx, route_id)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn set_post_tags(&self, id: PostId, tags: &[String]) -> RepoResult<()> {
        let post_id = id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !post_exists(&tx, &post_id)? {
            return Err(RepoError::not_found("post", id));
        }

        tx.execute("DELETE FROM post_tags WHERE post_uuid = ?1;", [post_id.as_str()])?;
        for tag in tags {
            ensure_tag(&tx, tag)?;
            tx.execute(
                "INSERT OR IGNORE INTO post_tags (post_uuid, tag_id)
                 SELECT ?1, id
                 FROM tags
                 WHERE name = ?2 COLLATE NOCASE;",
                params![post_id.as_str(), tag],
            )?;
        }
        tx.execute(
            "UPDATE posts SET updated_at = (strftime('%s', 'now') * 1000) WHERE uuid = ?1;",
            [post_id.as_str()],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn add_related(&self, id: PostId, related: PostId) -> RepoResult<()> {
        for candidate in [id, related] {
            if !post_exists(self.conn, &candidate.to_string())? {
                return Err(RepoError::not_found("post", candidate));
            }
        }
        self.conn
            .execute(
                "INSERT INTO related_posts (post_uuid, related_uuid) VALUES (?1, ?2);",
                params![id.to_string(), related.to_string()],
            )
            .map_err(|err| {
                conflict_on_unique(err, || format!("post {id} already links to {related}"))
            })?;
        Ok(())
    }

    fn remove_related(&self, id: PostId, related: PostId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM related_posts WHERE post_uuid = ?1 AND related_uuid = ?2;",
            params![id.to_string(), related.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("related post link", format!("{id}->{related}")));
        }
        Ok(())
    }

    fn list_related(&self, id: PostId, published_only: bool) -> RepoResult<Vec<PostSummary>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POST_SUMMARY_COLUMNS}
             FROM related_posts r
             INNER JOIN posts p ON p.uuid = r.related_uuid
             WHERE r.post_uuid = ?1
               AND (?2 = 0 OR p.status = 'published')
             ORDER BY r.created_at ASC, p.uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), i64::from(published_only)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_post_summary(row)?);
        }
        Ok(items)
    }

    fn category_exists(&self, id: CategoryId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn subcategory_parent(&self, id: SubcategoryId) -> RepoResult<Option<CategoryId>> {
        let parent: Option<String> = self
            .conn
            .query_row(
                "SELECT category_uuid FROM subcategories WHERE uuid = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        parent
            .map(|value| parse_uuid(&value, "subcategories.category_uuid"))
            .transpose()
    }
}

/// Normalizes list limit according to the posts contract.
pub fn normalize_post_limit(limit: Option<u32>) -> u32 {
    clamp_limit(limit, POSTS_DEFAULT_LIMIT, POSTS_LIMIT_MAX)
}

/// Normalizes one tag value: trimmed and lowercased, `None` when blank.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values, sorted by name.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn tag_slug(tag: &str) -> String {
    let slug = slugify(tag);
    if slug.is_empty() {
        format!("tag-{}", short_hash(tag))
    } else {
        slug
    }
}

fn short_hash(value: &str) -> String {
    blake3::hash(value.as_bytes()).to_hex().chars().take(8).collect()
}

/// Inserts `name` into `tags` unless present; slug collisions (`c` vs `c++`)
/// get a hash suffix.
fn ensure_tag(conn: &Connection, name: &str) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE name = ?1 COLLATE NOCASE);",
        [name],
        |row| row.get(0),
    )?;
    if exists == 1 {
        return Ok(());
    }

    let base = tag_slug(name);
    let slug_taken: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE slug = ?1);",
        [base.as_str()],
        |row| row.get(0),
    )?;
    let slug = if slug_taken == 1 {
        format!("{base}-{}", short_hash(name))
    } else {
        base
    };
    conn.execute(
        "INSERT INTO tags (name, slug) VALUES (?1, ?2);",
        params![name, slug],
    )?;
    Ok(())
}

pub(crate) fn parse_post_summary(row: &Row<'_>) -> RepoResult<PostSummary> {
    let uuid_text: String = row.get("post_uuid")?;
    let status_text: String = row.get("post_status")?;
    Ok(PostSummary {
        uuid: parse_uuid(&uuid_text, "posts.uuid")?,
        title: row.get("post_title")?,
        slug: row.get("post_slug")?,
        excerpt: row.get("post_excerpt")?,
        status: parse_status(&status_text)?,
    })
}

fn parse_post_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Post> {
    let uuid_text: String = row.get("uuid")?;
    let author_text: String = row.get("author_uuid")?;
    let status_text: String = row.get("status")?;
    let tags = load_tags_for_post(conn, &uuid_text)?;

    Ok(Post {
        uuid: parse_uuid(&uuid_text, "posts.uuid")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        content: row.get("content")?,
        excerpt: row.get("excerpt")?,
        cover_image: row.get("cover_image")?,
        author_uuid: parse_uuid(&author_text, "posts.author_uuid")?,
        category_uuid: parse_optional_uuid(row.get("category_uuid")?, "posts.category_uuid")?,
        subcategory_uuid: parse_optional_uuid(
            row.get("subcategory_uuid")?,
            "posts.subcategory_uuid",
        )?,
        status: parse_status(&status_text)?,
        published_at: row.get("published_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        tags,
    })
}

fn parse_status(value: &str) -> RepoResult<PostStatus> {
    PostStatus::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid post status `{value}`")))
}

fn load_tags_for_post(conn: &Connection, post_uuid: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM post_tags pt
         INNER JOIN tags t ON t.id = pt.tag_id
         WHERE pt.post_uuid = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([post_uuid])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn post_exists(conn: &Connection, post_uuid: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM posts WHERE uuid = ?1);",
        [post_uuid],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

#[cfg(test)]
mod tests {
    use super::{normalize_post_limit, normalize_tags, tag_slug};

    #[test]
    fn tags_are_trimmed_lowercased_and_deduplicated() {
        let tags = vec![
            " Topology ".to_string(),
            "topology".to_string(),
            "".to_string(),
            "ALGEBRA".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["algebra", "topology"]);
    }

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(normalize_post_limit(None), 20);
        assert_eq!(normalize_post_limit(Some(0)), 20);
        assert_eq!(normalize_post_limit(Some(500)), 100);
        assert_eq!(normalize_post_limit(Some(7)), 7);
    }

    #[test]
    fn non_ascii_tags_get_hashed_slug() {
        assert_eq!(tag_slug("linear algebra"), "linear-algebra");
        assert!(tag_slug("数学").starts_with("tag-"));
    }
}
