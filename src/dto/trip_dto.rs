use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::TripStatus;
use crate::services::trip_status_engine::StatusUpdateOutcome;
use crate::utils::validation::validate_not_empty;

// Request para crear o reemplazar un viaje
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TripRequest {
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    #[validate(range(min = 1))]
    pub vehicle_id: i32,
    #[validate(range(min = 1))]
    pub route_id: i32,
    #[validate(length(min = 1, max = 64), custom = "validate_not_empty")]
    pub pickup_id: String,
    #[validate(range(min = 1))]
    pub driver_id: Option<i32>,
    /// Por defecto, la capacidad del vehículo
    #[validate(range(min = 0))]
    pub total: Option<i32>,
    /// Por defecto, igual a `total`
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: i32,
}

// Query de búsqueda: ?fromId=&toId=&date=&quantity=
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchTripsQuery {
    pub from_id: i32,
    pub to_id: i32,
    pub date: String,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RouteTripsQuery {
    pub date: String,
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
}

// Response de cambio de estado
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateResponse {
    pub trip_id: i32,
    pub changed: bool,
    pub old_status: Option<i32>,
    pub new_status: i32,
}

impl StatusUpdateResponse {
    pub fn from_outcome(trip_id: i32, requested: TripStatus, outcome: StatusUpdateOutcome) -> Self {
        match outcome {
            StatusUpdateOutcome::Updated { old, new } => Self {
                trip_id,
                changed: true,
                old_status: Some(old),
                new_status: new.code(),
            },
            StatusUpdateOutcome::Unchanged | StatusUpdateOutcome::NotFound => Self {
                trip_id,
                changed: false,
                old_status: Some(requested.code()),
                new_status: requested.code(),
            },
        }
    }
}
