//! Post use-case service.
//!
//! # Responsibility
//! - Validate post input, taxonomy consistency and ownership.
//! - Derive listing projections (excerpt, cover image) from markdown.
//! - Keep the anchor index in `post_anchors` in step with post content.
//!
//! # Invariants
//! - Editors may only modify posts they wrote; admins modify any post.
//! - Anonymous viewers only ever see published posts.
//! - Anchor sync failures are logged and never fail the primary write.

use crate::markdown::{
    derive_markdown_preview, extract_anchors, AnchorLookup, RenderedDocument, Renderer,
};
use crate::model::anchor::AnchorRecord;
use crate::model::author::Author;
use crate::model::post::{Post, PostDraft, PostFields, PostId, PostStatus, PostSummary};
use crate::model::ValidationError;
use crate::repo::anchor_repo::AnchorRepository;
use crate::repo::post_repo::{
    normalize_post_limit, normalize_tag, normalize_tags, PostListQuery, PostRepository,
};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

/// One page of posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsPage {
    /// Sorted by `COALESCE(published_at, created_at) DESC, uuid ASC`.
    pub items: Vec<Post>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
    pub offset: u32,
}

/// Post service facade over repository implementations.
pub struct PostService<P: PostRepository, A: AnchorRepository + AnchorLookup> {
    posts: P,
    anchors: A,
}

impl<P: PostRepository, A: AnchorRepository + AnchorLookup> PostService<P, A> {
    pub fn new(posts: P, anchors: A) -> Self {
        Self { posts, anchors }
    }

    /// Creates a post owned by `actor`.
    pub fn create_post(&self, actor: &Author, draft: &PostDraft) -> ServiceResult<Post> {
        let fields = self.prepare_fields(draft)?;
        let tags = draft.tags.as_deref().map(validate_tags).transpose()?;

        let post_id = self.posts.create_post(actor.uuid, &fields)?;
        if let Some(tags) = tags {
            self.posts.set_post_tags(post_id, &tags)?;
        }
        info!(
            "event=post_create module=service status=ok post_uuid={post_id} author_uuid={}",
            actor.uuid
        );

        let post = self.load_required(post_id)?;
        self.sync_anchors(&post);
        Ok(post)
    }

    /// Replaces all editable fields; tags are only touched when supplied.
    pub fn update_post(
        &self,
        actor: &Author,
        id: PostId,
        draft: &PostDraft,
    ) -> ServiceResult<Post> {
        let existing = self.load_required(id)?;
        ensure_can_edit(actor, &existing)?;

        let fields = self.prepare_fields(draft)?;
        let tags = draft.tags.as_deref().map(validate_tags).transpose()?;

        self.posts.update_post(id, &fields)?;
        if let Some(tags) = tags {
            self.posts.set_post_tags(id, &tags)?;
        }
        info!(
            "event=post_update module=service status=ok post_uuid={id} author_uuid={}",
            actor.uuid
        );

        let post = self.load_required(id)?;
        self.sync_anchors(&post);
        Ok(post)
    }

    pub fn delete_post(&self, actor: &Author, id: PostId) -> ServiceResult<()> {
        let existing = self.load_required(id)?;
        ensure_can_edit(actor, &existing)?;
        self.posts.delete_post(id)?;
        info!(
            "event=post_delete module=service status=ok post_uuid={id} author_uuid={}",
            actor.uuid
        );
        Ok(())
    }

    /// Gets a post; drafts are hidden from anonymous viewers.
    pub fn get_post(&self, id: PostId, viewer: Option<&Author>) -> ServiceResult<Post> {
        self.posts
            .get_post(id)?
            .filter(|post| visible_to(post, viewer))
            .ok_or_else(|| ServiceError::not_found("post", id))
    }

    pub fn get_post_by_slug(&self, slug: &str, viewer: Option<&Author>) -> ServiceResult<Post> {
        self.posts
            .get_post_by_slug(slug)?
            .filter(|post| visible_to(post, viewer))
            .ok_or_else(|| ServiceError::not_found("post", slug))
    }

    /// Lists posts. Anonymous viewers are pinned to published posts.
    pub fn list_posts(
        &self,
        mut query: PostListQuery,
        viewer: Option<&Author>,
    ) -> ServiceResult<PostsPage> {
        if viewer.is_none() {
            query.status = Some(PostStatus::Published);
        }
        query.tag = query.tag.and_then(|tag| normalize_tag(&tag));
        let applied_limit = normalize_post_limit(query.limit);
        query.limit = Some(applied_limit);

        let items = self.posts.list_posts(&query)?;
        Ok(PostsPage {
            items,
            applied_limit,
            offset: query.offset,
        })
    }

    /// Atomically replaces the full tag set of one post.
    pub fn set_post_tags(
        &self,
        actor: &Author,
        id: PostId,
        tags: &[String],
    ) -> ServiceResult<Post> {
        let existing = self.load_required(id)?;
        ensure_can_edit(actor, &existing)?;
        let normalized = validate_tags(tags)?;
        self.posts.set_post_tags(id, &normalized)?;
        self.load_required(id)
    }

    pub fn add_related(&self, actor: &Author, id: PostId, related: PostId) -> ServiceResult<()> {
        if id == related {
            return Err(ValidationError::Inconsistent(
                "a post cannot be related to itself".to_string(),
            )
            .into());
        }
        let existing = self.load_required(id)?;
        ensure_can_edit(actor, &existing)?;
        self.posts.add_related(id, related)?;
        Ok(())
    }

    pub fn remove_related(
        &self,
        actor: &Author,
        id: PostId,
        related: PostId,
    ) -> ServiceResult<()> {
        let existing = self.load_required(id)?;
        ensure_can_edit(actor, &existing)?;
        self.posts.remove_related(id, related)?;
        Ok(())
    }

    pub fn list_related(
        &self,
        id: PostId,
        viewer: Option<&Author>,
    ) -> ServiceResult<Vec<PostSummary>> {
        self.get_post(id, viewer)?;
        Ok(self.posts.list_related(id, viewer.is_none())?)
    }

    /// Lists persisted anchors of a visible post.
    pub fn list_anchors(
        &self,
        id: PostId,
        viewer: Option<&Author>,
    ) -> ServiceResult<Vec<AnchorRecord>> {
        self.get_post(id, viewer)?;
        Ok(self.anchors.list_post_anchors(id)?)
    }

    /// Renders a post to HTML, resolving cross-post references.
    pub fn render_post(&self, post: &Post) -> RenderedDocument {
        Renderer::new(&self.anchors)
            .with_post_slug(post.slug.as_str())
            .render(&post.content)
    }

    /// Renders unsaved markdown, e.g. for the editor live preview.
    pub fn preview(&self, source: &str, post_slug: Option<&str>) -> RenderedDocument {
        let renderer = Renderer::new(&self.anchors);
        match post_slug {
            Some(slug) => renderer.with_post_slug(slug).render(source),
            None => renderer.render(source),
        }
    }

    fn prepare_fields(&self, draft: &PostDraft) -> ServiceResult<PostFields> {
        let mut fields = draft.validate()?;

        if let Some(category) = fields.category_uuid {
            if !self.posts.category_exists(category)? {
                return Err(ServiceError::not_found("category", category));
            }
        }
        if let Some(subcategory) = fields.subcategory_uuid {
            let parent = self
                .posts
                .subcategory_parent(subcategory)?
                .ok_or_else(|| ServiceError::not_found("subcategory", subcategory))?;
            if Some(parent) != fields.category_uuid {
                return Err(ValidationError::Inconsistent(format!(
                    "subcategory {subcategory} does not belong to the selected category"
                ))
                .into());
            }
        }

        if fields.excerpt.is_none() || fields.cover_image.is_none() {
            let preview = derive_markdown_preview(&fields.content);
            if fields.excerpt.is_none() {
                fields.excerpt = preview.excerpt;
            }
            if fields.cover_image.is_none() {
                fields.cover_image = preview.cover_image;
            }
        }
        Ok(fields)
    }

    fn load_required(&self, id: PostId) -> ServiceResult<Post> {
        self.posts
            .get_post(id)?
            .ok_or_else(|| ServiceError::not_found("post", id))
    }

    fn sync_anchors(&self, post: &Post) {
        let anchors = extract_anchors(&post.content);
        match self.anchors.replace_post_anchors(post.uuid, &anchors) {
            Ok(()) => info!(
                "event=anchor_sync module=service status=ok post_uuid={} anchors={}",
                post.uuid,
                anchors.len()
            ),
            Err(err) => warn!(
                "event=anchor_sync module=service status=error post_uuid={} error={err}",
                post.uuid
            ),
        }
    }
}

fn visible_to(post: &Post, viewer: Option<&Author>) -> bool {
    viewer.is_some() || post.is_published()
}

fn ensure_can_edit(actor: &Author, post: &Post) -> ServiceResult<()> {
    if actor.can_edit_post(post.author_uuid) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "author {} cannot modify post {}",
            actor.uuid, post.uuid
        )))
    }
}

/// Rejects blank tags, then normalizes and deduplicates.
fn validate_tags(tags: &[String]) -> ServiceResult<Vec<String>> {
    if tags.iter().any(|tag| tag.trim().is_empty()) {
        return Err(ValidationError::BlankField("tags").into());
    }
    Ok(normalize_tags(tags))
}
