//! Collection repository contracts and SQLite implementation.
//!
//! # Invariants
//! - A post appears at most once per collection.
//! - Items are listed by `added_at ASC, post uuid ASC`.

use crate::model::collection::{Collection, CollectionFields, CollectionId, CollectionItem};
use crate::model::post::PostId;
use crate::repo::post_repo::{parse_post_summary, POST_SUMMARY_COLUMNS};
use crate::repo::{conflict_on_unique, ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const COLLECTION_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    slug,
    description,
    (SELECT COUNT(*) FROM collection_items ci WHERE ci.collection_uuid = collections.uuid)
        AS item_count,
    created_at,
    updated_at
FROM collections";

pub trait CollectionRepository {
    fn create_collection(&self, fields: &CollectionFields) -> RepoResult<Collection>;
    fn update_collection(&self, id: CollectionId, fields: &CollectionFields)
        -> RepoResult<Collection>;
    fn get_collection(&self, id: CollectionId) -> RepoResult<Option<Collection>>;
    fn list_collections(&self) -> RepoResult<Vec<Collection>>;
    fn delete_collection(&self, id: CollectionId) -> RepoResult<()>;
    fn list_items(&self, id: CollectionId, published_only: bool)
        -> RepoResult<Vec<CollectionItem>>;
    fn add_item(
        &self,
        id: CollectionId,
        post: PostId,
        description: Option<&str>,
    ) -> RepoResult<CollectionItem>;
    fn update_item(
        &self,
        id: CollectionId,
        post: PostId,
        description: Option<&str>,
    ) -> RepoResult<CollectionItem>;
    fn remove_item(&self, id: CollectionId, post: PostId) -> RepoResult<()>;
}

pub struct SqliteCollectionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCollectionRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required_collection(&self, id: CollectionId) -> RepoResult<Collection> {
        self.get_collection(id)?
            .ok_or_else(|| RepoError::not_found("collection", id))
    }

    fn load_required_item(&self, id: CollectionId, post: PostId) -> RepoResult<CollectionItem> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                ci.collection_uuid AS collection_uuid,
                ci.description AS description,
                ci.added_at AS added_at,
                {POST_SUMMARY_COLUMNS}
             FROM collection_items ci
             INNER JOIN posts p ON p.uuid = ci.post_uuid
             WHERE ci.collection_uuid = ?1
               AND ci.post_uuid = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), post.to_string()])?;
        if let Some(row) = rows.next()? {
            return parse_item_row(row);
        }
        Err(RepoError::not_found("collection item", post))
    }
}

impl CollectionRepository for SqliteCollectionRepository<'_> {
    fn create_collection(&self, fields: &CollectionFields) -> RepoResult<Collection> {
        let id = CollectionId::new_v4();
        self.conn
            .execute(
                "INSERT INTO collections (uuid, name, slug, description) VALUES (?1, ?2, ?3, ?4);",
                params![id.to_string(), fields.name, fields.slug, fields.description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || {
                    format!("collection slug `{}` already exists", fields.slug)
                })
            })?;
        self.load_required_collection(id)
    }

    fn update_collection(
        &self,
        id: CollectionId,
        fields: &CollectionFields,
    ) -> RepoResult<Collection> {
        let changed = self
            .conn
            .execute(
                "UPDATE collections
                 SET name = ?2,
                     slug = ?3,
                     description = ?4,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![id.to_string(), fields.name, fields.slug, fields.description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || {
                    format!("collection slug `{}` already exists", fields.slug)
                })
            })?;
        if changed == 0 {
            return Err(RepoError::not_found("collection", id));
        }
        self.load_required_collection(id)
    }

    fn get_collection(&self, id: CollectionId) -> RepoResult<Option<Collection>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COLLECTION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_collection_row(row)?));
        }
        Ok(None)
    }

    fn list_collections(&self) -> RepoResult<Vec<Collection>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COLLECTION_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut collections = Vec::new();
        while let Some(row) = rows.next()? {
            collections.push(parse_collection_row(row)?);
        }
        Ok(collections)
    }

    fn delete_collection(&self, id: CollectionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM collections WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("collection", id));
        }
        Ok(())
    }

    fn list_items(
        &self,
        id: CollectionId,
        published_only: bool,
    ) -> RepoResult<Vec<CollectionItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                ci.collection_uuid AS collection_uuid,
                ci.description AS description,
                ci.added_at AS added_at,
                {POST_SUMMARY_COLUMNS}
             FROM collection_items ci
             INNER JOIN posts p ON p.uuid = ci.post_uuid
             WHERE ci.collection_uuid = ?1
               AND (?2 = 0 OR p.status = 'published')
             ORDER BY ci.added_at ASC, p.uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), i64::from(published_only)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn add_item(
        &self,
        id: CollectionId,
        post: PostId,
        description: Option<&str>,
    ) -> RepoResult<CollectionItem> {
        self.load_required_collection(id)?;
        let post_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM posts WHERE uuid = ?1);",
            [post.to_string()],
            |row| row.get(0),
        )?;
        if post_exists == 0 {
            return Err(RepoError::not_found("post", post));
        }

        self.conn
            .execute(
                "INSERT INTO collection_items (collection_uuid, post_uuid, description)
                 VALUES (?1, ?2, ?3);",
                params![id.to_string(), post.to_string(), description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || format!("post {post} is already in collection {id}"))
            })?;
        self.load_required_item(id, post)
    }

    fn update_item(
        &self,
        id: CollectionId,
        post: PostId,
        description: Option<&str>,
    ) -> RepoResult<CollectionItem> {
        let changed = self.conn.execute(
            "UPDATE collection_items
             SET description = ?3
             WHERE collection_uuid = ?1
               AND post_uuid = ?2;",
            params![id.to_string(), post.to_string(), description],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("collection item", post));
        }
        self.load_required_item(id, post)
    }

    fn remove_item(&self, id: CollectionId, post: PostId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM collection_items WHERE collection_uuid = ?1 AND post_uuid = ?2;",
            params![id.to_string(), post.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("collection item", post));
        }
        Ok(())
    }
}

fn parse_collection_row(row: &Row<'_>) -> RepoResult<Collection> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Collection {
        uuid: parse_uuid(&uuid_text, "collections.uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        item_count: row.get("item_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<CollectionItem> {
    let collection_text: String = row.get("collection_uuid")?;
    Ok(CollectionItem {
        collection_uuid: parse_uuid(&collection_text, "collection_items.collection_uuid")?,
        description: row.get("description")?,
        added_at: row.get("added_at")?,
        post: parse_post_summary(row)?,
    })
}
