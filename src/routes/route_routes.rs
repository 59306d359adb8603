use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::dto::stop_dto::{CreateStopRequest, RoutePathResponse};
use crate::dto::trip_dto::RouteTripsQuery;
use crate::dto::ApiResponse;
use crate::middleware::ActorId;
use crate::models::{Stop, TripInfo};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/:route_id/trips", get(route_trips))
        .route("/:route_id/stops", get(list_stops).post(create_stop))
        .route("/:route_id/paths", get(route_paths))
}

async fn route_trips(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
    Query(query): Query<RouteTripsQuery>,
) -> Result<Json<ApiResponse<Vec<TripInfo>>>, AppError> {
    let infos = state.trips.route_trips(route_id, &query.date, query.quantity).await?;
    Ok(Json(ApiResponse::success(infos)))
}

async fn list_stops(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<Stop>>>, AppError> {
    let stops = state.stops.list_stops(route_id).await?;
    Ok(Json(ApiResponse::success(stops)))
}

async fn create_stop(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(route_id): Path<i32>,
    Json(request): Json<CreateStopRequest>,
) -> Result<Json<ApiResponse<Stop>>, AppError> {
    let stop = state.stops.create_stop(actor, route_id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        stop,
        "Stop created successfully".to_string(),
    )))
}

async fn route_paths(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<RoutePathResponse>>>, AppError> {
    let paths = state.stops.route_paths(route_id).await?;
    Ok(Json(ApiResponse::success(paths)))
}
