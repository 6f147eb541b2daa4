//! Collection use-cases. Writes are admin-only.

use crate::model::author::Author;
use crate::model::collection::{
    Collection, CollectionDraft, CollectionId, CollectionItem, CollectionItemDraft,
    CollectionItemUpdate,
};
use crate::model::optional_text;
use crate::model::post::PostId;
use crate::repo::collection_repo::CollectionRepository;
use crate::service::{require_admin, ServiceError, ServiceResult};

pub struct CollectionService<C: CollectionRepository> {
    repo: C,
}

impl<C: CollectionRepository> CollectionService<C> {
    pub fn new(repo: C) -> Self {
        Self { repo }
    }

    pub fn list_collections(&self) -> ServiceResult<Vec<Collection>> {
        Ok(self.repo.list_collections()?)
    }

    pub fn get_collection(&self, id: CollectionId) -> ServiceResult<Collection> {
        self.repo
            .get_collection(id)?
            .ok_or_else(|| ServiceError::not_found("collection", id))
    }

    pub fn create_collection(
        &self,
        actor: &Author,
        draft: &CollectionDraft,
    ) -> ServiceResult<Collection> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        Ok(self.repo.create_collection(&fields)?)
    }

    pub fn update_collection(
        &self,
        actor: &Author,
        id: CollectionId,
        draft: &CollectionDraft,
    ) -> ServiceResult<Collection> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        Ok(self.repo.update_collection(id, &fields)?)
    }

    pub fn delete_collection(&self, actor: &Author, id: CollectionId) -> ServiceResult<()> {
        require_admin(actor)?;
        Ok(self.repo.delete_collection(id)?)
    }

    /// Lists items by `added_at`; drafts are hidden from anonymous viewers.
    pub fn list_items(
        &self,
        id: CollectionId,
        viewer: Option<&Author>,
    ) -> ServiceResult<Vec<CollectionItem>> {
        self.get_collection(id)?;
        Ok(self.repo.list_items(id, viewer.is_none())?)
    }

    pub fn add_item(
        &self,
        actor: &Author,
        id: CollectionId,
        draft: &CollectionItemDraft,
    ) -> ServiceResult<CollectionItem> {
        require_admin(actor)?;
        let description = optional_text(draft.description.as_deref());
        Ok(self
            .repo
            .add_item(id, draft.post_uuid, description.as_deref())?)
    }

    pub fn update_item(
        &self,
        actor: &Author,
        id: CollectionId,
        post: PostId,
        update: &CollectionItemUpdate,
    ) -> ServiceResult<CollectionItem> {
        require_admin(actor)?;
        let description = optional_text(update.description.as_deref());
        Ok(self.repo.update_item(id, post, description.as_deref())?)
    }

    pub fn remove_item(&self, actor: &Author, id: CollectionId, post: PostId) -> ServiceResult<()> {
        require_admin(actor)?;
        Ok(self.repo.remove_item(id, post)?)
    }
}
