//! Reading-route repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist routes and their ordered items.
//! - Keep ordering rewrites inside the repository boundary.
//!
//! # Invariants
//! - Item listing is deterministic: `position ASC, uuid ASC`.
//! - After every write, positions of one route are exactly `0..n-1`.
//! - Reorders run in one IMMEDIATE transaction.

use crate::model::post::PostId;
use crate::model::route::{Route, RouteFields, RouteId, RouteItem, RouteItemId};
use crate::repo::post_repo::{parse_post_summary, POST_SUMMARY_COLUMNS};
use crate::repo::{conflict_on_unique, ensure_schema_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const ROUTE_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    slug,
    description,
    (SELECT COUNT(*) FROM route_items ri WHERE ri.route_uuid = routes.uuid) AS item_count,
    created_at,
    updated_at
FROM routes";

/// Repository interface for routes and route items.
pub trait RouteRepository {
    fn create_route(&self, fields: &RouteFields) -> RepoResult<Route>;
    fn update_route(&self, id: RouteId, fields: &RouteFields) -> RepoResult<Route>;
    fn get_route(&self, id: RouteId) -> RepoResult<Option<Route>>;
    fn get_route_by_slug(&self, slug: &str) -> RepoResult<Option<Route>>;
    fn list_routes(&self) -> RepoResult<Vec<Route>>;
    fn delete_route(&self, id: RouteId) -> RepoResult<()>;
    /// Lists items in reading order.
    fn list_items(&self, route: RouteId, published_only: bool) -> RepoResult<Vec<RouteItem>>;
    /// Inserts a post at `position` (appends when `None`; clamped).
    fn add_item(
        &self,
        route: RouteId,
        post: PostId,
        position: Option<i64>,
        note: Option<&str>,
    ) -> RepoResult<RouteItem>;
    /// Moves one item to `position` (clamped) and shifts its siblings.
    fn move_item(&self, route: RouteId, item: RouteItemId, position: i64) -> RepoResult<()>;
    fn update_item_note(&self, route: RouteId, item: RouteItemId, note: Option<&str>)
        -> RepoResult<()>;
    fn remove_item(&self, route: RouteId, item: RouteItemId) -> RepoResult<()>;
}

/// SQLite-backed route repository.
pub struct SqliteRouteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRouteRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    fn load_required_route(&self, id: RouteId) -> RepoResult<Route> {
        self.get_route(id)?
            .ok_or_else(|| RepoError::not_found("route", id))
    }
}

impl RouteRepository for SqliteRouteRepository<'_> {
    fn create_route(&self, fields: &RouteFields) -> RepoResult<Route> {
        let id = RouteId::new_v4();
        self.conn
            .execute(
                "INSERT INTO routes (uuid, title, slug, description) VALUES (?1, ?2, ?3, ?4);",
                params![id.to_string(), fields.title, fields.slug, fields.description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || format!("route slug `{}` already exists", fields.slug))
            })?;
        self.load_required_route(id)
    }

    fn update_route(&self, id: RouteId, fields: &RouteFields) -> RepoResult<Route> {
        let changed = self
            .conn
            .execute(
                "UPDATE routes
                 SET title = ?2,
                     slug = ?3,
                     description = ?4,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![id.to_string(), fields.title, fields.slug, fields.description],
            )
            .map_err(|err| {
                conflict_on_unique(err, || format!("route slug `{}` already exists", fields.slug))
            })?;
        if changed == 0 {
            return Err(RepoError::not_found("route", id));
        }
        self.load_required_route(id)
    }

    fn get_route(&self, id: RouteId) -> RepoResult<Option<Route>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ROUTE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_route_row(row)?));
        }
        Ok(None)
    }

    fn get_route_by_slug(&self, slug: &str) -> RepoResult<Option<Route>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ROUTE_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_route_row(row)?));
        }
        Ok(None)
    }

    fn list_routes(&self) -> RepoResult<Vec<Route>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ROUTE_SELECT_SQL} ORDER BY title COLLATE NOCASE ASC, uuid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut routes = Vec::new();
        while let Some(row) = rows.next()? {
            routes.push(parse_route_row(row)?);
        }
        Ok(routes)
    }

    fn delete_route(&self, id: RouteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM routes WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("route", id));
        }
        Ok(())
    }

    fn list_items(&self, route: RouteId, published_only: bool) -> RepoResult<Vec<RouteItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT
                ri.uuid AS uuid,
                ri.route_uuid AS route_uuid,
                ri.position AS position,
                ri.note AS note,
                {POST_SUMMARY_COLUMNS}
             FROM route_items ri
             INNER JOIN posts p ON p.uuid = ri.post_uuid
             WHERE ri.route_uuid = ?1
               AND (?2 = 0 OR p.status = 'published')
             ORDER BY ri.position ASC, ri.uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![route.to_string(), i64::from(published_only)])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_route_item_row(row)?);
        }
        Ok(items)
    }

    fn add_item(
        &self,
        route: RouteId,
        post: PostId,
        position: Option<i64>,
        note: Option<&str>,
    ) -> RepoResult<RouteItem> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_exists(&tx, "routes", "route", route)?;
        ensure_exists(&tx, "posts", "post", post)?;

        let mut ordered = list_item_ids(&tx, route)?;
        let item_id = RouteItemId::new_v4();
        tx.execute(
            "INSERT INTO route_items (uuid, route_uuid, post_uuid, position, note)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                item_id.to_string(),
                route.to_string(),
                post.to_string(),
                ordered.len() as i64,
                note,
            ],
        )
        .map_err(|err| {
            conflict_on_unique(err, || format!("post {post} is already on route {route}"))
        })?;

        let index = clamp_index(position, ordered.len());
        ordered.insert(index, item_id);
        write_positions(&tx, &ordered)?;
        touch_route(&tx, route)?;
        tx.commit()?;

        self.list_items(route, false)?
            .into_iter()
            .find(|item| item.uuid == item_id)
            .ok_or_else(|| RepoError::not_found("route item", item_id))
    }

    fn move_item(&self, route: RouteId, item: RouteItemId, position: i64) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut ordered = list_item_ids(&tx, route)?;
        let Some(current) = ordered.iter().position(|id| *id == item) else {
            return Err(RepoError::not_found("route item", item));
        };
        ordered.remove(current);

        let index = clamp_index(Some(position), ordered.len());
        ordered.insert(index, item);
        write_positions(&tx, &ordered)?;
        touch_route(&tx, route)?;
        tx.commit()?;
        Ok(())
    }

    fn update_item_note(
        &self,
        route: RouteId,
        item: RouteItemId,
        note: Option<&str>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE route_items SET note = ?3 WHERE uuid = ?1 AND route_uuid = ?2;",
            params![item.to_string(), route.to_string(), note],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("route item", item));
        }
        Ok(())
    }

    fn remove_item(&self, route: RouteId, item: RouteItemId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "DELETE FROM route_items WHERE uuid = ?1 AND route_uuid = ?2;",
            params![item.to_string(), route.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("route item", item));
        }
        renumber_route(&tx, route)?;
        touch_route(&tx, route)?;
        tx.commit()?;
        Ok(())
    }
}

/// Rewrites positions of one route to `0..n-1`, keeping current order.
pub(crate) fn renumber_route(conn: &Connection, route: RouteId) -> RepoResult<()> {
    let ordered = list_item_ids(conn, route)?;
    write_positions(conn, &ordered)
}

fn list_item_ids(conn: &Connection, route: RouteId) -> RepoResult<Vec<RouteItemId>> {
    let mut stmt = conn.prepare(
        "SELECT uuid
         FROM route_items
         WHERE route_uuid = ?1
         ORDER BY position ASC, uuid ASC;",
    )?;
    let mut rows = stmt.query([route.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "route_items.uuid")?);
    }
    Ok(ids)
}

fn write_positions(conn: &Connection, ordered: &[RouteItemId]) -> RepoResult<()> {
    for (index, id) in ordered.iter().enumerate() {
        conn.execute(
            "UPDATE route_items SET position = ?2 WHERE uuid = ?1 AND position <> ?2;",
            params![id.to_string(), index as i64],
        )?;
    }
    Ok(())
}

fn clamp_index(position: Option<i64>, len: usize) -> usize {
    position
        .unwrap_or(len as i64)
        .clamp(0, len as i64) as usize
}

fn touch_route(conn: &Connection, route: RouteId) -> RepoResult<()> {
    conn.execute(
        "UPDATE routes SET updated_at = (strftime('%s', 'now') * 1000) WHERE uuid = ?1;",
        [route.to_string()],
    )?;
    Ok(())
}

fn ensure_exists(
    conn: &Connection,
    table: &'static str,
    entity: &'static str,
    id: uuid::Uuid,
) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE uuid = ?1);"),
        [id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::not_found(entity, id))
    }
}

fn parse_route_row(row: &Row<'_>) -> RepoResult<Route> {
    let uuid_text: String = row.get("uuid")?;
    Ok(Route {
        uuid: parse_uuid(&uuid_text, "routes.uuid")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        item_count: row.get("item_count")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_route_item_row(row: &Row<'_>) -> RepoResult<RouteItem> {
    let uuid_text: String = row.get("uuid")?;
    let route_text: String = row.get("route_uuid")?;
    Ok(RouteItem {
        uuid: parse_uuid(&uuid_text, "route_items.uuid")?,
        route_uuid: parse_uuid(&route_text, "route_items.route_uuid")?,
        position: row.get("position")?,
        note: row.get("note")?,
        post: parse_post_summary(row)?,
    })
}

#[cfg(test)]
mod tests {
    use super::clamp_index;

    #[test]
    fn clamp_index_appends_by_default_and_bounds_input() {
        assert_eq!(clamp_index(None, 3), 3);
        assert_eq!(clamp_index(Some(-4), 3), 0);
        assert_eq!(clamp_index(Some(1), 3), 1);
        assert_eq!(clamp_index(Some(99), 3), 3);
    }
}
