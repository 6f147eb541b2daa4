use crate::auth::{CurrentAuthor, MaybeAuthor};
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use mindraxia_core::model::post::PostId;
use mindraxia_core::model::route::{
    Route, RouteDraft, RouteId, RouteItem, RouteItemDraft, RouteItemId, RouteItemUpdate,
    RouteNeighbors,
};
use mindraxia_core::repo::route_repo::SqliteRouteRepository;
use mindraxia_core::service::route_service::RouteService;
use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PositionBody {
    pub position: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/routes", get(list_routes).post(create_route))
        .route(
            "/routes/{id}",
            get(get_route).put(update_route).delete(delete_route),
        )
        .route("/routes/{id}/items", get(list_items).post(add_item))
        .route(
            "/routes/{id}/items/{item_id}",
            put(update_item).delete(remove_item),
        )
        .route("/routes/{id}/items/{item_id}/position", put(move_item))
        .route("/routes/{id}/neighbors/{post_id}", get(neighbors))
}

fn service(conn: &Connection) -> Result<RouteService<SqliteRouteRepository<'_>>, ApiError> {
    Ok(RouteService::new(SqliteRouteRepository::try_new(conn)?))
}

async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<Route>>, ApiError> {
    let routes = state.with_conn(|conn| Ok(service(conn)?.list_routes()?))?;
    Ok(Json(routes))
}

async fn create_route(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiJson(draft): ApiJson<RouteDraft>,
) -> Result<(StatusCode, Json<Route>), ApiError> {
    let route = state.with_conn(|conn| Ok(service(conn)?.create_route(&actor, &draft)?))?;
    Ok((StatusCode::CREATED, Json(route)))
}

/// Accepts either the route UUID or its slug.
async fn get_route(
    State(state): State<AppState>,
    ApiPath(key): ApiPath<String>,
) -> Result<Json<Route>, ApiError> {
    let route = state.with_conn(|conn| {
        let service = service(conn)?;
        let route = match RouteId::parse_str(&key) {
            Ok(id) => service.get_route(id)?,
            Err(_) => service.get_route_by_slug(&key)?,
        };
        Ok(route)
    })?;
    Ok(Json(route))
}

async fn update_route(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<RouteId>,
    ApiJson(draft): ApiJson<RouteDraft>,
) -> Result<Json<Route>, ApiError> {
    let route = state.with_conn(|conn| Ok(service(conn)?.update_route(&actor, id, &draft)?))?;
    Ok(Json(route))
}

async fn delete_route(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<RouteId>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(service(conn)?.delete_route(&actor, id)?))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_items(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiPath(id): ApiPath<RouteId>,
) -> Result<Json<Vec<RouteItem>>, ApiError> {
    let items = state.with_conn(|conn| Ok(service(conn)?.list_items(id, viewer.as_ref())?))?;
    Ok(Json(items))
}

async fn add_item(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath(id): ApiPath<RouteId>,
    ApiJson(draft): ApiJson<RouteItemDraft>,
) -> Result<(StatusCode, Json<RouteItem>), ApiError> {
    let item = state.with_conn(|conn| Ok(service(conn)?.add_item(&actor, id, &draft)?))?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath((id, item)): ApiPath<(RouteId, RouteItemId)>,
    ApiJson(update): ApiJson<RouteItemUpdate>,
) -> Result<Json<RouteItem>, ApiError> {
    let item =
        state.with_conn(|conn| Ok(service(conn)?.update_item(&actor, id, item, &update)?))?;
    Ok(Json(item))
}

/// Moves one item and returns the whole route in its new order.
async fn move_item(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath((id, item)): ApiPath<(RouteId, RouteItemId)>,
    ApiJson(body): ApiJson<PositionBody>,
) -> Result<Json<Vec<RouteItem>>, ApiError> {
    let items =
        state.with_conn(|conn| Ok(service(conn)?.move_item(&actor, id, item, body.position)?))?;
    Ok(Json(items))
}

async fn remove_item(
    State(state): State<AppState>,
    CurrentAuthor(actor): CurrentAuthor,
    ApiPath((id, item)): ApiPath<(RouteId, RouteItemId)>,
) -> Result<StatusCode, ApiError> {
    state.with_conn(|conn| Ok(service(conn)?.remove_item(&actor, id, item)?))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn neighbors(
    State(state): State<AppState>,
    MaybeAuthor(viewer): MaybeAuthor,
    ApiPath((id, post)): ApiPath<(RouteId, PostId)>,
) -> Result<Json<RouteNeighbors>, ApiError> {
    let neighbors =
        state.with_conn(|conn| Ok(service(conn)?.neighbors(id, post, viewer.as_ref())?))?;
    Ok(Json(neighbors))
}
