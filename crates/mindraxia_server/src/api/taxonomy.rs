use crate::auth::CurrentAuthor;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use mindraxia_core::model::taxonomy::{
    Category, CategoryDetail, CategoryDraft, CategoryId, Subcategory, SubcategoryId, Tag, TagId,
};
use mindraxia_core::repo::taxonomy_repo::SqliteTaxonomyRepository;
use mindraxia_core::service::taxonomy_service::TaxonomyService;
use rusqlite::Connection;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route(
            "/categories/{id}/subcategories",
            get(list_subcategories).post(create_subcategory),
        )
        .route(
            "/subcategories/{id}",
            put(update_subcategory).delete(delete_subcategory),
        )
        .route("/tags", get(list_tags))
        .route("/tags/{id}", delete(delete_tag))
}

fn service(conn: &Connection) -> Result<TaxonomyService<SqliteTaxonomyRepository<'_>>, ApiError> {
    Ok(TaxonomyService::new(SqliteTaxonomyRepository::try_new(conn)?))
}

async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    let categories = state.with_conn(|conn| Ok(service(conn)?.list_categories()?))?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.with_conn(|conn| Ok(service(conn)?.create_category(&actor, &draft)?))?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn get_category(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<CategoryDetail>, ApiError> {
    let detail = state.with_conn(|conn| Ok(service(conn)?.get_category(id)?))?;
    Ok(Json(detail))
}

async fn update_category(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<Json<Category>, ApiError> {
    let category =
        state.with_conn(|conn| Ok(service(conn)?.update_category(&actor, id, &draft)?))?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(service(conn)?.delete_category(&actor, id)?))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_subcategories(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<Vec<Subcategory>>, ApiError> {
    let subcategories = state.with_conn(|conn| Ok(service(conn)?.list_subcategories(id)?))?;
    Ok(Json(subcategories))
}

async fn create_subcategory(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<(StatusCode, Json<Subcategory>), ApiError> {
    let subcategory =
        state.with_conn(|conn| Ok(service(conn)?.create_subcategory(&actor, id, &draft)?))?;
    Ok((StatusCode::CREATED, Json(subcategory)))
}

async fn update_subcategory(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<SubcategoryId>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<Json<Subcategory>, ApiError> {
    let subcategory =
        state.with_conn(|conn| Ok(service(conn)?.update_subcategory(&actor, id, &draft)?))?;
    Ok(Json(subcategory))
}

async fn delete_subcategory(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<SubcategoryId>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(service(conn)?.delete_subcategory(&actor, id)?))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = state.with_conn(|conn| Ok(service(conn)?.list_tags()?))?;
    Ok(Json(tags))
}

async fn delete_tag(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<TagId>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(service(conn)?.delete_tag(&actor, id)?))?;
    Ok(StatusCode::NO_CONTENT)
}
