//! Category, subcategory and tag use-cases. Writes are admin-only.

use crate::model::author::Author;
use crate::model::taxonomy::{
    Category, CategoryDetail, CategoryDraft, CategoryId, Subcategory, SubcategoryId, Tag, TagId,
};
use crate::repo::taxonomy_repo::TaxonomyRepository;
use crate::service::{require_admin, ServiceError, ServiceResult};
use log::info;

pub struct TaxonomyService<T: TaxonomyRepository> {
    repo: T,
}

impl<T: TaxonomyRepository> TaxonomyService<T> {
    pub fn new(repo: T) -> Self {
        Self { repo }
    }

    pub fn list_categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.repo.list_categories()?)
    }

    /// Gets one category with its subcategories.
    pub fn get_category(&self, id: CategoryId) -> ServiceResult<CategoryDetail> {
        let category = self.load_category(id)?;
        let subcategories = self.repo.list_subcategories(id)?;
        Ok(CategoryDetail {
            category,
            subcategories,
        })
    }

    pub fn create_category(
        &self,
        actor: &Author,
        draft: &CategoryDraft,
    ) -> ServiceResult<Category> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        let category = self.repo.create_category(&fields)?;
        info!(
            "event=category_create module=service status=ok category_uuid={}",
            category.uuid
        );
        Ok(category)
    }

    pub fn update_category(
        &self,
        actor: &Author,
        id: CategoryId,
        draft: &CategoryDraft,
    ) -> ServiceResult<Category> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        Ok(self.repo.update_category(id, &fields)?)
    }

    /// Deletes a category, its subcategories, and detaches its posts.
    pub fn delete_category(&self, actor: &Author, id: CategoryId) -> ServiceResult<()> {
        require_admin(actor)?;
        self.repo.delete_category(id)?;
        info!("event=category_delete module=service status=ok category_uuid={id}");
        Ok(())
    }

    pub fn list_subcategories(&self, category: CategoryId) -> ServiceResult<Vec<Subcategory>> {
        self.load_category(category)?;
        Ok(self.repo.list_subcategories(category)?)
    }

    pub fn create_subcategory(
        &self,
        actor: &Author,
        category: CategoryId,
        draft: &CategoryDraft,
    ) -> ServiceResult<Subcategory> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        Ok(self.repo.create_subcategory(category, &fields)?)
    }

    pub fn update_subcategory(
        &self,
        actor: &Author,
        id: SubcategoryId,
        draft: &CategoryDraft,
    ) -> ServiceResult<Subcategory> {
        require_admin(actor)?;
        let fields = draft.validate()?;
        Ok(self.repo.update_subcategory(id, &fields)?)
    }

    pub fn delete_subcategory(&self, actor: &Author, id: SubcategoryId) -> ServiceResult<()> {
        require_admin(actor)?;
        Ok(self.repo.delete_subcategory(id)?)
    }

    pub fn list_tags(&self) -> ServiceResult<Vec<Tag>> {
        Ok(self.repo.list_tags()?)
    }

    /// Deletes a tag and detaches it from every post.
    pub fn delete_tag(&self, actor: &Author, id: TagId) -> ServiceResult<()> {
        require_admin(actor)?;
        Ok(self.repo.delete_tag(id)?)
    }

    fn load_category(&self, id: CategoryId) -> ServiceResult<Category> {
        self.repo
            .get_category(id)?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }
}
