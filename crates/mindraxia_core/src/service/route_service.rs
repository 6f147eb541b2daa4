//! Reading-route use-cases.
//!
//! # Invariants
//! - Writes are admin-only.
//! - Anonymous viewers see only published posts of a route; neighbours skip
//!   drafts for them as well.

use crate::model::author::Author;
use crate::model::optional_text;
use crate::model::post::PostId;
use crate::model::route::{
    Route, RouteDraft, RouteId, RouteItem, RouteItemDraft, RouteItemId, RouteItemUpdate,
    RouteNeighbors,
};
use crate::repo::route_repo::RouteRepository;
use crate::service::{require_admin, ServiceError, ServiceResult};
use log::info;

pub struct RouteService<R: RouteRepository> {
    repo: R,
}

impl<R: RouteRepository> RouteService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn list_routes(&self) -> ServiceResult<Vec<Route>> {
        Ok(self.repo.list_routes()?)
    }

    pub fn get_route(&self, id: RouteId) -> ServiceResult<Route> {
        self.repo
            .get_route(id)?
            .ok_or_else(|| ServiceError::not_found("route", id))
    }

    pub fn get_route_by_slug(&self, slug: &str) -> ServiceResult<Route> {
        self.repo
            .get_route_by_slug(slug)?
            .ok_or_else(|| ServiceError::not_found("route", slug))
    }

    pub fn create_route(&self, actor: &Author, draft: &RouteDraft) -> ServiceResult<Route> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        let route = self.repo.create_route(&fields)?;
        info!(
            "event=route_create module=service status=ok route_uuid={}",
            route.uuid
        );
        Ok(route)
    }

    pub fn update_route(
        &self,
        actor: &Author,
        id: RouteId,
        draft: &RouteDraft,
    ) -> ServiceResult<Route> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        Ok(self.repo.update_route(id, &fields)?)
    }

    pub fn delete_route(&self, actor: &Author, id: RouteId) -> ServiceResult<()> {
        require_admin(actor)?;
        Ok(self.repo.delete_route(id)?)
    }

    /// Lists items in reading order.
    pub fn list_items(
        &self,
        id: RouteId,
        viewer: Option<&Author>,
    ) -> ServiceResult<Vec<RouteItem>> {
        self.get_route(id)?;
        Ok(self.repo.list_items(id, viewer.is_none())?)
    }

    /// Adds a post at the requested position (end when omitted).
    pub fn add_item(
        &self,
        actor: &Author,
        id: RouteId,
        draft: &RouteItemDraft,
    ) -> ServiceResult<RouteItem> {
        require_admin(actor)?;
        let note = optional_text(draft.note.as_deref());
        let item = self
            .repo
            .add_item(id, draft.post_uuid, draft.position, note.as_deref())?;
        info!(
            "event=route_item_add module=service status=ok route_uuid={id} post_uuid={} position={}",
            draft.post_uuid, item.position
        );
        Ok(item)
    }

    /// Moves one item and returns the route's new order.
    pub fn move_item(
        &self,
        actor: &Author,
        id: RouteId,
        item: RouteItemId,
        position: i64,
    ) -> ServiceResult<Vec<RouteItem>> {
        require_admin(actor)?;
        self.repo.move_item(id, item, position)?;
        info!(
            "event=route_item_move module=service status=ok route_uuid={id} item_uuid={item} position={position}"
        );
        Ok(self.repo.list_items(id, false)?)
    }

    /// Applies a position and/or note change to one item.
    pub fn update_item(
        &self,
        actor: &Author,
        id: RouteId,
        item: RouteItemId,
        update: &RouteItemUpdate,
    ) -> ServiceResult<RouteItem> {
        require_admin(actor)?;
        if let Some(note) = update.note.as_deref() {
            let note = optional_text(Some(note));
            self.repo.update_item_note(id, item, note.as_deref())?;
        }
        if let Some(position) = update.position {
            self.repo.move_item(id, item, position)?;
        }
        self.repo
            .list_items(id, false)?
            .into_iter()
            .find(|candidate| candidate.uuid == item)
            .ok_or_else(|| ServiceError::not_found("route item", item))
    }

    /// Removes an item; later items shift up by one.
    pub fn remove_item(&self, actor: &Author, id: RouteId, item: RouteItemId) -> ServiceResult<()> {
        require_admin(actor)?;
        Ok(self.repo.remove_item(id, item)?)
    }

    /// Previous and next post around `post` within the route.
    pub fn neighbors(
        &self,
        id: RouteId,
        post: PostId,
        viewer: Option<&Author>,
    ) -> ServiceResult<RouteNeighbors> {
        let items = self.list_items(id, viewer)?;
        let index = items
            .iter()
            .position(|item| item.post.uuid == post)
            .ok_or_else(|| ServiceError::not_found("route item", post))?;

        Ok(RouteNeighbors {
            route_uuid: id,
            position: items[index].position,
            total: items.len(),
            previous: index
                .checked_sub(1)
                .and_then(|prev| items.get(prev))
                .map(|item| item.post.clone()),
            next: items.get(index + 1).map(|item| item.post.clone()),
        })
    }
}
