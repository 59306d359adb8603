use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};

use crate::dto::trip_dto::{SearchTripsQuery, StatusUpdateResponse, TripRequest, UpdateStatusRequest};
use crate::dto::ApiResponse;
use crate::middleware::ActorId;
use crate::models::{Trip, TripInfo, TripLogEntry, TripStatus};
use crate::services::trip_status_engine::StatusUpdateOutcome;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, AppError};

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/search", get(search_trips))
        .route("/status/:status", get(trips_by_status))
        .route("/driver/:driver_id", get(trips_by_driver))
        .route("/:id", get(get_trip).put(update_trip).delete(delete_trip))
        .route("/:id/info", get(trip_info))
        .route("/:id/status", put(update_status))
        .route("/:id/logs", get(trip_logs))
}

async fn list_trips(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let trips = state.trips.list_trips().await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn get_trip(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let trip = state.trips.get_trip(id).await?;
    Ok(Json(ApiResponse::success(trip)))
}

async fn create_trip(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(request): Json<TripRequest>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let trip = state.trips.create_trip(actor, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        trip,
        "Trip created successfully".to_string(),
    )))
}

async fn update_trip(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<i32>,
    Json(request): Json<TripRequest>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let trip = state.trips.update_trip(actor, id, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        trip,
        "Trip updated successfully".to_string(),
    )))
}

async fn delete_trip(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.trips.delete_trip(actor, id).await?;
    Ok(Json(ApiResponse::message(format!("Trip {} deleted", id))))
}

async fn search_trips(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Query(query): Query<SearchTripsQuery>,
) -> Result<Json<ApiResponse<Vec<TripInfo>>>, AppError> {
    let infos = state
        .trips
        .search(query.from_id, query.to_id, &query.date, query.quantity, actor)
        .await?;
    Ok(Json(ApiResponse::success(infos)))
}

async fn trip_info(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TripInfo>>, AppError> {
    let info = state.trips.trip_info(id).await?;
    Ok(Json(ApiResponse::success(info)))
}

async fn trips_by_status(
    State(state): State<AppState>,
    Path(status): Path<i32>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let trips = state.status_engine.trips_by_status(status).await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn update_status(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<i32>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<StatusUpdateResponse>>, AppError> {
    let requested = TripStatus::try_from(request.status)?;
    let outcome = state.status_engine.update_status(actor, id, request.status).await?;
    if outcome == StatusUpdateOutcome::NotFound {
        return Err(not_found_error("Trip", id));
    }
    Ok(Json(ApiResponse::success(StatusUpdateResponse::from_outcome(
        id, requested, outcome,
    ))))
}

async fn trips_by_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<Trip>>>, AppError> {
    let trips = state.trips.trips_by_driver(driver_id).await?;
    Ok(Json(ApiResponse::success(trips)))
}

async fn trip_logs(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<TripLogEntry>>>, AppError> {
    let logs = state.trips.trip_logs(id).await?;
    Ok(Json(ApiResponse::success(logs)))
}
