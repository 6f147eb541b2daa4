//! Category, subcategory and tag persistence.
//!
//! # Invariants
//! - Category slugs are globally unique; subcategory slugs are unique per
//!   category.
//! - Deleting a category cascades to its subcategories and detaches posts.

use crate::model::taxonomy::{
    Category, CategoryFields, CategoryId, Subcategory, SubcategoryId, Tag, TagId,
};
use crate::repo::{conflict_on_unique, ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const CATEGORY_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    slug,
    description,
    created_at,
    updated_at
FROM categories";

const SUBCATEGORY_SELECT_SQL: &str = "SELECT
    uuid,
    category_uuid,
    name,
    slug,
    description,
    created_at,
    updated_at
FROM subcategories";

pub trait TaxonomyRepository {
    fn create_category(&self, fields: &CategoryFields) -> RepoResult<Category>;
    fn update_category(&self, id: CategoryId, fields: &CategoryFields) -> RepoResult<Category>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>>;
    fn list_categories(&self) -> RepoResult<Vec<Category>>;
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;

    fn create_subcategory(
        &self,
        category: CategoryId,
        fields: &CategoryFields,
    ) -> RepoResult<Subcategory>;
    fn update_subcategory(
        &self,
        id: SubcategoryId,
        fields: &CategoryFields,
    ) -> RepoResult<Subcategory>;
    fn get_subcategory(&self, id: SubcategoryId) -> RepoResult<Option<Subcategory>>;
    fn list_subcategories(&self, category: CategoryId) -> RepoResult<Vec<Subcategory>>;
    fn delete_subcategory(&self, id: SubcategoryId) -> RepoResult<()>;

    /// Lists tags with post counts, sorted by name.
    fn list_tags(&self) -> RepoResult<Vec<Tag>>;
    fn delete_tag(&self, id: TagId) -> RepoResult<()>;
}

pub struct SqliteTaxonomyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxonomyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaxonomyRepository for SqliteTaxonomyRepository<'_> {
    fn create_category(&self, fields: &CategoryFields) -> RepoResult<Category> {
        let id = CategoryId::new_v4();
        self.conn
            .execute(
                "INSERT INTO categories (uuid, name, slug, description) VALUES (?1, ?2, ?3, ?4);",
                params![id.to_string(), fields.name, fields.slug, fields.description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || {
                    format!("category slug `{}` already exists", fields.slug)
                })
            })?;
        self.get_category(id)?
            .ok_or_else(|| RepoError::not_found("category", id))
    }

    fn update_category(&self, id: CategoryId, fields: &CategoryFields) -> RepoResult<Category> {
        let changed = self
            .conn
            .execute(
                "UPDATE categories
                 SET name = ?2,
                     slug = ?3,
                     description = ?4,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![id.to_string(), fields.name, fields.slug, fields.description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || {
                    format!("category slug `{}` already exists", fields.slug)
                })
            })?;
        if changed == 0 {
            return Err(RepoError::not_found("category", id));
        }
        self.get_category(id)?
            .ok_or_else(|| RepoError::not_found("category", id))
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CATEGORY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_category_row(row)?));
        }
        Ok(None)
    }

    fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CATEGORY_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            categories.push(parse_category_row(row)?);
        }
        Ok(categories)
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM categories WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("category", id));
        }
        Ok(())
    }

    fn create_subcategory(
        &self,
        category: CategoryId,
        fields: &CategoryFields,
    ) -> RepoResult<Subcategory> {
        if self.get_category(category)?.is_none() {
            return Err(RepoError::not_found("category", category));
        }

        let id = SubcategoryId::new_v4();
        self.conn
            .execute(
                "INSERT INTO subcategories (uuid, category_uuid, name, slug, description)
                 VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    id.to_string(),
                    category.to_string(),
                    fields.name,
                    fields.slug,
                    fields.description,
                ],
            )
            .map_err(|err| {
                conflict_on_unique(err, || {
                    format!("subcategory slug `{}` already exists in category", fields.slug)
                })
            })?;
        self.get_subcategory(id)?
            .ok_or_else(|| RepoError::not_found("subcategory", id))
    }

    fn update_subcategory(
        &self,
        id: SubcategoryId,
        fields: &CategoryFields,
    ) -> RepoResult<Subcategory> {
        let changed = self
            .conn
            .execute(
                "UPDATE subcategories
                 SET name = ?2,
                     slug = ?3,
                     description = ?4,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![id.to_string(), fields.name, fields.slug, fields.description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || {
                    format!("subcategory slug `{}` already exists in category", fields.slug)
                })
            })?;
        if changed == 0 {
            return Err(RepoError::not_found("subcategory", id));
        }
        self.get_subcategory(id)?
            .ok_or_else(|| RepoError::not_found("subcategory", id))
    }

    fn get_subcategory(&self, id: SubcategoryId) -> RepoResult<Option<Subcategory>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUBCATEGORY_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_subcategory_row(row)?));
        }
        Ok(None)
    }

    fn list_subcategories(&self, category: CategoryId) -> RepoResult<Vec<Subcategory>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SUBCATEGORY_SELECT_SQL}
             WHERE category_uuid = ?1
             ORDER BY name COLLATE NOCASE ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([category.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_subcategory_row(row)?);
        }
        Ok(items)
    }

    fn delete_subcategory(&self, id: SubcategoryId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM subcategories WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("subcategory", id));
        }
        Ok(())
    }

    fn list_tags(&self) -> RepoResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                t.id AS id,
                t.name AS name,
                t.slug AS slug,
                COUNT(pt.post_uuid) AS post_count
             FROM tags t
             LEFT JOIN post_tags pt ON pt.tag_id = t.id
             GROUP BY t.id
             ORDER BY t.name COLLATE NOCASE ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(Tag {
                id: row.get("id")?,
                name: row.get("name")?,
                slug: row.get("slug")?,
                post_count: row.get("post_count")?,
            });
        }
        Ok(tags)
    }

    fn delete_tag(&self, id: TagId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM tags WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("tag", id));
        }
        Ok(())
    }
}

fn parse_category_row(row: &Row<'_>) -> RepoResult<Category> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Category {
        uuid: parse_uuid(&uuid_text, "categories.uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_subcategory_row(row: &Row<'_>) -> RepoResult<Subcategory> {
    let uuid_text: String = row.get("uuid")?;
    let category_text: String = row.get("category_uuid")?;
    Ok(Subcategory {
        uuid: parse_uuid(&uuid_text, "subcategories.uuid")?,
        category_uuid: parse_uuid(&category_text, "subcategories.category_uuid")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
