use super::post_service;
use crate::auth::{CurrentAuthor, MaybeAuthor};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use mindraxia_core::model::anchor::AnchorRecord;
use mindraxia_core::model::post::{Post, PostDraft, PostId, PostStatus, PostSummary};
use mindraxia_core::repo::post_repo::PostListQuery;
use mindraxia_core::RenderedDocument;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/tags", put(set_tags))
        .route("/posts/{id}/related", get(list_related).post(add_related))
        .route("/posts/{id}/related/{related_id}", delete(remove_related))
        .route("/posts/{id}/anchors", get(list_anchors))
        .route("/posts/{id}/html", get(render_html))
        .route("/preview", post(preview))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsParams {
    pub status: Option<String>,
    pub category: Option<Uuid>,
    pub subcategory: Option<Uuid>,
    pub tag: Option<String>,
    pub author: Option<Uuid>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PostsPageBody {
    pub items: Vec<Post>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct TagsBody {
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RelatedBody {
    pub related_uuid: PostId,
}

#[derive(Debug, Deserialize)]
pub struct PreviewBody {
    pub content: String,
    #[serde(default)]
    pub slug: Option<String>,
}

async fn list_posts(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiQuery(params): ApiQuery<ListPostsParams>,
) -> Result<Json<PostsPageBody>, ApiError> {
    let status = params
        .status
        .as_deref()
        .map(|value| {
            PostStatus::parse(value)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown post status `{value}`")))
        })
        .transpose()?;
    let query = PostListQuery {
        status,
        category: params.category,
        subcategory: params.subcategory,
        tag: params.tag,
        author: params.author,
        limit: params.limit,
        offset: params.offset.unwrap_or(0),
    };

    let page = state.with_conn(|conn| {
        Ok(post_service(conn, viewer.as_ref())?.list_posts(query, viewer.as_ref())?)
    })?;
    Ok(Json(PostsPageBody {
        items: page.items,
        limit: page.applied_limit,
        offset: page.offset,
    }))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiJson(draft): ApiJson<PostDraft>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let post = state.with_conn(|conn| {
        Ok(post_service(conn, Some(&actor))?.create_post(&actor, &draft)?)
    })?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<Post>, ApiError> {
    let post = state.with_conn(|conn| {
        Ok(post_service(conn, viewer.as_ref())?.get_post(id, viewer.as_ref())?)
    })?;
    Ok(Json(post))
}

async fn update_post(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(draft): ApiJson<PostDraft>,
) -> Result<Json<Post>, ApiError> {
    let post = state.with_conn(|conn| {
        Ok(post_service(conn, Some(&actor))?.update_post(&actor, id, &draft)?)
    })?;
    Ok(Json(post))
}

async fn delete_post(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<PostId>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(post_service(conn, Some(&actor))?.delete_post(&actor, id)?))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_tags(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(body): ApiJson<TagsBody>,
) -> Result<Json<Post>, ApiError> {
    let post = state.with_conn(|conn| {
        Ok(post_service(conn, Some(&actor))?.set_post_tags(&actor, id, &body.tags)?)
    })?;
    Ok(Json(post))
}

async fn list_related(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<Vec<PostSummary>>, ApiError> {
    let related = state.with_conn(|conn| {
        Ok(post_service(conn, viewer.as_ref())?.list_related(id, viewer.as_ref())?)
    })?;
    Ok(Json(related))
}

async fn add_related(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<PostId>,
    ApiJson(body): ApiJson<RelatedBody>,
) -> Result<(StatusCode, Json<Vec<PostSummary>>), ApiError> {
    let related = state.with_conn(|conn| {
        let service = post_service(conn, Some(&actor))?;
        service.add_related(&actor, id, body.related_uuid)?;
        Ok(service.list_related(id, Some(&actor))?)
    })?;
    Ok((StatusCode::CREATED, Json(related)))
}

async fn remove_related(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath((id, related)): ApiPath<(PostId, PostId)>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| {
        Ok(post_service(conn, Some(&actor))?.remove_related(&actor, id, related)?)
    })?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_anchors(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<Vec<AnchorRecord>>, ApiError> {
    let anchors = state.with_conn(|conn| {
        Ok(post_service(conn, viewer.as_ref())?.list_anchors(id, viewer.as_ref())?)
    })?;
    Ok(Json(anchors))
}

async fn render_html(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiPath(id): ApiPath<PostId>,
) -> Result<Json<RenderedDocument>, ApiError> {
    let rendered = state.with_conn(|conn| {
        let service = post_service(conn, viewer.as_ref())?;
        let post = service.get_post(id, viewer.as_ref())?;
        Ok(service.render_post(&post))
    })?;
    Ok(Json(rendered))
}

async fn preview(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiJson(body): ApiJson<PreviewBody>,
) -> Result<Json<RenderedDocument>, ApiError> {
    let rendered = state.with_conn(|conn| {
        Ok(post_service(conn, Some(&actor))?.preview(&body.content, body.slug.as_deref()))
    })?;
    Ok(Json(rendered))
}
