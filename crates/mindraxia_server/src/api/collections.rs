use crate::auth::{CurrentAuthor, MaybeAuthor};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use mindraxia_core::model::collection::{
    Collection, CollectionDraft, CollectionId, CollectionItem, CollectionItemDraft,
    CollectionItemUpdate,
};
use mindraxia_core::model::post::PostId;
use mindraxia_core::repo::collection_repo::SqliteCollectionRepository;
use mindraxia_core::service::collection_service::CollectionService;
use rusqlite::Connection;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections", get(list_collections).post(create_collection))
        .route(
            "/collections/{id}",
            get(get_collection)
                .put(update_collection)
                .delete(delete_collection),
        )
        .route("/collections/{id}/items", get(list_items).post(add_item))
        .route(
            "/collections/{id}/items/{post_id}",
            put(update_item).delete(remove_item),
        )
}

fn service(
    conn: &Connection,
) -> Result<CollectionService<SqliteCollectionRepository<'_>>, ApiError> {
    Ok(CollectionService::new(SqliteCollectionRepository::try_new(conn)?))
}

async fn list_collections(
    State(state): State<AppState>,
) -> Result<Json<Vec<Collection>>, ApiError> {
    let collections = state.with_conn(|conn| Ok(service(conn)?.list_collections()?))?;
    Ok(Json(collections))
}

async fn create_collection(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiJson(draft): ApiJson<CollectionDraft>,
) -> Result<(StatusCode, Json<Collection>), ApiError> {
    let collection =
        state.with_conn(|conn| Ok(service(conn)?.create_collection(&actor, &draft)?))?;
    Ok((StatusCode::CREATED, Json(collection)))
}

async fn get_collection(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CollectionId>,
) -> Result<Json<Collection>, ApiError> {
    let collection = state.with_conn(|conn| Ok(service(conn)?.get_collection(id)?))?;
    Ok(Json(collection))
}

async fn update_collection(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<CollectionId>,
    ApiJson(draft): ApiJson<CollectionDraft>,
) -> Result<Json<Collection>, ApiError> {
    let collection =
        state.with_conn(|conn| Ok(service(conn)?.update_collection(&actor, id, &draft)?))?;
    Ok(Json(collection))
}

async fn delete_collection(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<CollectionId>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(service(conn)?.delete_collection(&actor, id)?))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_items(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiPath(id): ApiPath<CollectionId>,
) -> Result<Json<Vec<CollectionItem>>, ApiError> {
    let items = state.with_conn(|conn| Ok(service(conn)?.list_items(id, viewer.as_ref())?))?;
    Ok(Json(items))
}

async fn add_item(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<CollectionId>,
    ApiJson(draft): ApiJson<CollectionItemDraft>,
) -> Result<(StatusCode, Json<CollectionItem>), ApiError> {
    let item = state.with_conn(|conn| Ok(service(conn)?.add_item(&actor, id, &draft)?))?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath((id, post)): ApiPath<(CollectionId, PostId)>,
    ApiJson(update): ApiJson<CollectionItemUpdate>,
) -> Result<Json<CollectionItem>, ApiError> {
    let item =
        state.with_conn(|conn| Ok(service(conn)?.update_item(&actor, id, post, &update)?))?;
    Ok(Json(item))
}

async fn remove_item(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath((id, post)): ApiPath<(CollectionId, PostId)>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(service(conn)?.remove_item(&actor, id, post)?))?;
    Ok(StatusCode::NO_CONTENT)
}
