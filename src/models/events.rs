//! Eventos intercambiados con el broker de mensajes
//!
//! Todos los payloads viajan como JSON con claves camelCase.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Reserva o liberación de asientos emitida por el servicio de reservas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatUpdateEvent {
    pub trip_id: String,
    pub seat_count: i32,
    /// Id único opcional del productor, usado como clave de deduplicación
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripCreatedEvent {
    pub trip_id: String,
    pub total_seats: i32,
    pub creation_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripStatusUpdateEvent {
    pub trip_id: i32,
    pub old_status: Option<i32>,
    pub new_status: i32,
    pub updated_by: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl TripStatusUpdateEvent {
    /// El viaje pasó de "no ha salido" a "salió"
    pub fn is_departure(&self) -> bool {
        self.old_status == Some(0) && self.new_status == 1
    }
}

/// Telemetría de búsquedas; no la consume este servicio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSearchEvent {
    pub from_province_id: i32,
    pub to_province_id: i32,
    pub departure_date: NaiveDate,
    pub search_timestamp: DateTime<Utc>,
    pub quantity: i32,
    pub user_id: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_event_accepts_payload_without_event_id() {
        let event: SeatUpdateEvent = serde_json::from_str(r#"{"tripId":"17","seatCount":3}"#).unwrap();
        assert_eq!(event.trip_id, "17");
        assert_eq!(event.seat_count, 3);
        assert!(event.event_id.is_none());
    }

    #[test]
    fn test_status_event_uses_camel_case_keys() {
        let event = TripStatusUpdateEvent {
            trip_id: 4,
            old_status: Some(0),
            new_status: 1,
            updated_by: Some(9),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["tripId"], 4);
        assert_eq!(value["oldStatus"], 0);
        assert_eq!(value["newStatus"], 1);
        assert_eq!(value["updatedBy"], 9);
        assert!(event.is_departure());
    }

    #[test]
    fn test_only_zero_to_one_is_a_departure() {
        let mut event = TripStatusUpdateEvent {
            trip_id: 4,
            old_status: Some(1),
            new_status: 2,
            updated_by: None,
            updated_at: Utc::now(),
        };
        assert!(!event.is_departure());
        event.old_status = None;
        event.new_status = 1;
        assert!(!event.is_departure());
    }
}
