//! Registro de auditoría de viajes
//!
//! Una fila por cada acción que modifica un viaje. Solo se agregan filas,
//! nunca se actualizan ni se borran.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripLogEntry {
    pub id: i64,
    pub trip_id: i32,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTripLog {
    pub trip_id: i32,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<i32>,
}

impl NewTripLog {
    pub fn now(trip_id: i32, updated_by: Option<i32>) -> Self {
        Self {
            trip_id,
            updated_at: Utc::now(),
            updated_by,
        }
    }
}
