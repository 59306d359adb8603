//! Modelo de Trip
//!
//! Este módulo contiene el struct Trip, su estado y las proyecciones de lectura
//! que se entregan a los pasajeros. Mapea a la tabla `trip` del schema PostgreSQL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::utils::errors::AppError;

/// Estado del viaje: 0 = no ha salido, 1 = salió, 2 = llegó, 3 = cancelado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum TripStatus {
    NotDeparted,
    Departed,
    Arrived,
    Cancelled,
}

impl TripStatus {
    pub const ALL: [TripStatus; 4] = [
        TripStatus::NotDeparted,
        TripStatus::Departed,
        TripStatus::Arrived,
        TripStatus::Cancelled,
    ];

    pub fn code(self) -> i32 {
        match self {
            TripStatus::NotDeparted => 0,
            TripStatus::Departed => 1,
            TripStatus::Arrived => 2,
            TripStatus::Cancelled => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::NotDeparted => "not_departed",
            TripStatus::Departed => "departed",
            TripStatus::Arrived => "arrived",
            TripStatus::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<i32> for TripStatus {
    type Error = AppError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TripStatus::NotDeparted),
            1 => Ok(TripStatus::Departed),
            2 => Ok(TripStatus::Arrived),
            3 => Ok(TripStatus::Cancelled),
            other => Err(AppError::InvalidStatus(other)),
        }
    }
}

impl From<TripStatus> for i32 {
    fn from(status: TripStatus) -> Self {
        status.code()
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code(), self.as_str())
    }
}

/// Trip principal - mapea exactamente a la tabla trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: i32,
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub vehicle_id: i32,
    pub route_id: i32,
    /// Parada de origen; fija cuál de los caminos de la ruta usa el viaje
    pub pickup_id: String,
    pub driver_id: Option<i32>,
    pub total: i32,
    pub stock: i32,
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

impl Trip {
    pub fn departure_at(&self) -> Option<NaiveDateTime> {
        Some(self.departure_date?.and_time(self.departure_time?))
    }

    pub fn arrival_at(&self) -> Option<NaiveDateTime> {
        Some(self.arrival_date?.and_time(self.arrival_time?))
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == TripStatus::Cancelled.code()
    }
}

/// Datos ya resueltos para insertar o reemplazar un viaje
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub vehicle_id: i32,
    pub route_id: i32,
    pub pickup_id: String,
    pub driver_id: Option<i32>,
    pub total: i32,
    pub stock: i32,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i32>,
}

/// Resultado de aplicar un delta de asientos sobre `stock`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockUpdate {
    Applied { stock: i32, total: i32 },
    /// La clave de deduplicación ya había sido aplicada
    Duplicate,
    TripNotFound,
}

/// Parámetros de búsqueda de viajes para pasajeros
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripSearchQuery {
    pub from_province_id: i32,
    pub to_province_id: i32,
    pub departure_date: NaiveDate,
    pub min_seats: i32,
}

/// Proyección de lectura: viaje + ruta + camino + vehículo
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TripInfo {
    pub trip_id: i32,
    pub vehicle_id: String,
    pub license: String,
    pub vehicle_type: String,
    pub status: i32,
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    pub stock: i32,
    pub price: i32,
    pub estimated_distance: String,
    pub estimated_time: String,
    pub departure_station: String,
    pub arrival_station: Option<String>,
    #[serde(skip)]
    pub route_id: i32,
    #[serde(skip)]
    pub path_id: i32,
    #[sqlx(skip)]
    pub full_route: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip_through_i32() {
        for status in TripStatus::ALL {
            assert_eq!(TripStatus::try_from(status.code()).unwrap(), status);
        }
    }

    #[test]
    fn test_status_out_of_range_is_rejected() {
        assert!(matches!(TripStatus::try_from(4), Err(AppError::InvalidStatus(4))));
        assert!(matches!(TripStatus::try_from(-1), Err(AppError::InvalidStatus(-1))));
    }

    #[test]
    fn test_status_serializes_as_number() {
        assert_eq!(serde_json::to_string(&TripStatus::Departed).unwrap(), "1");
        let parsed: TripStatus = serde_json::from_str("3").unwrap();
        assert_eq!(parsed, TripStatus::Cancelled);
    }

    #[test]
    fn test_schedule_requires_date_and_time() {
        let trip = Trip {
            id: 1,
            departure_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            departure_time: None,
            arrival_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            arrival_time: NaiveTime::from_hms_opt(12, 0, 0),
            vehicle_id: 1,
            route_id: 1,
            pickup_id: "10".into(),
            driver_id: Some(5),
            total: 10,
            stock: 10,
            status: 0,
            created_at: Utc::now(),
            created_by: None,
        };
        assert!(trip.departure_at().is_none());
        assert_eq!(
            trip.arrival_at(),
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(12, 0, 0)
        );
    }
}
