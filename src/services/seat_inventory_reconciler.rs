//! Conciliación del inventario de asientos
//!
//! Aplica los eventos `seats_reserved` / `seats_released` del servicio de
//! reservas sobre el contador `stock` del viaje. Cada mensaje se aplica como
//! un único incremento atómico y una sola vez por clave de deduplicación.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::messaging::{topics, BusMessage};
use crate::models::events::SeatUpdateEvent;
use crate::models::StockUpdate;
use crate::repositories::TripStore;
use crate::utils::errors::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatAdjustment {
    Reserve,
    Release,
}

impl SeatAdjustment {
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic {
            topics::SEATS_RESERVED => Some(SeatAdjustment::Reserve),
            topics::SEATS_RELEASED => Some(SeatAdjustment::Release),
            _ => None,
        }
    }

    pub fn delta(self, seat_count: i32) -> i32 {
        match self {
            SeatAdjustment::Reserve => -seat_count,
            SeatAdjustment::Release => seat_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { trip_id: i32, stock: i32, total: i32 },
    Duplicate,
    /// Viaje inexistente; el mensaje se descarta
    UnknownTrip(i32),
    /// Mensaje inválido; se registra y se salta
    Skipped(String),
}

pub struct SeatInventoryReconciler {
    trips: Arc<dyn TripStore>,
}

impl SeatInventoryReconciler {
    pub fn new(trips: Arc<dyn TripStore>) -> Self {
        Self { trips }
    }

    /// Aplica un mensaje. Solo los errores de E/S del almacén se propagan.
    pub async fn reconcile(&self, message: &BusMessage) -> AppResult<ReconcileOutcome> {
        let Some(adjustment) = SeatAdjustment::from_topic(&message.topic) else {
            return Ok(skip(message, format!("unexpected topic '{}'", message.topic)));
        };

        let event: SeatUpdateEvent = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => return Ok(skip(message, format!("undecodable payload: {}", e))),
        };

        let Ok(trip_id) = event.trip_id.trim().parse::<i32>() else {
            return Ok(skip(message, format!("non-numeric trip id '{}'", event.trip_id)));
        };

        if event.seat_count < 0 {
            return Ok(skip(message, format!("negative seat count {}", event.seat_count)));
        }

        let dedup_key = event
            .event_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| message.coordinates());
        let delta = adjustment.delta(event.seat_count);

        match self.trips.apply_stock_delta(trip_id, delta, &dedup_key).await? {
            StockUpdate::Applied { stock, total } => {
                if stock < 0 || stock > total {
                    warn!(
                        "⚠️ Viaje {}: stock fuera de rango tras {:?} de {} asientos ({}/{})",
                        trip_id, adjustment, event.seat_count, stock, total
                    );
                } else {
                    info!(
                        "💺 Viaje {}: {:?} de {} asientos, stock {}/{}",
                        trip_id, adjustment, event.seat_count, stock, total
                    );
                }
                Ok(ReconcileOutcome::Applied { trip_id, stock, total })
            }
            StockUpdate::Duplicate => {
                debug!("⏭️ Evento de asientos {} ya aplicado", dedup_key);
                Ok(ReconcileOutcome::Duplicate)
            }
            StockUpdate::TripNotFound => {
                warn!("⚠️ Viaje {} no encontrado, evento de asientos descartado", trip_id);
                Ok(ReconcileOutcome::UnknownTrip(trip_id))
            }
        }
    }

    /// Olvida las claves más antiguas que `retention`; una reentrega posterior
    /// a ese horizonte ya no se reconocería como duplicada
    pub async fn prune_processed(&self, retention: Duration) -> AppResult<u64> {
        let retention = chrono::Duration::from_std(retention)
            .map_err(|e| AppError::Internal(format!("invalid dedup retention: {}", e)))?;
        let pruned = self
            .trips
            .prune_processed_seat_events(Utc::now() - retention)
            .await?;
        if pruned > 0 {
            info!("🧹 {} claves de eventos de asientos olvidadas", pruned);
        }
        Ok(pruned)
    }
}

fn skip(message: &BusMessage, reason: String) -> ReconcileOutcome {
    warn!("⚠️ Mensaje {} saltado: {}", message.coordinates(), reason);
    ReconcileOutcome::Skipped(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Trip, TripStatus};
    use crate::repositories::InMemoryStore;

    fn message(topic: &str, offset: i64, payload: &str) -> BusMessage {
        BusMessage {
            topic: topic.to_string(),
            partition: 0,
            offset,
            key: None,
            payload: payload.as_bytes().to_vec(),
        }
    }

    fn setup(stock: i32) -> (Arc<InMemoryStore>, SeatInventoryReconciler) {
        let store = Arc::new(InMemoryStore::new());
        store.add_trip(Trip {
            id: 17,
            departure_date: None,
            departure_time: None,
            arrival_date: None,
            arrival_time: None,
            vehicle_id: 1,
            route_id: 1,
            pickup_id: "10".into(),
            driver_id: None,
            total: 10,
            stock,
            status: TripStatus::NotDeparted.code(),
            created_at: Utc::now(),
            created_by: None,
        });
        let reconciler = SeatInventoryReconciler::new(store.clone());
        (store, reconciler)
    }

    #[tokio::test]
    async fn test_reserve_then_release_restores_stock() {
        let (store, reconciler) = setup(10);
        reconciler
            .reconcile(&message("seats_reserved", 0, r#"{"tripId":"17","seatCount":4}"#))
            .await
            .unwrap();
        reconciler
            .reconcile(&message("seats_released", 0, r#"{"tripId":"17","seatCount":4}"#))
            .await
            .unwrap();
        assert_eq!(store.trip(17).unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_event_id_takes_precedence_over_coordinates() {
        let (store, reconciler) = setup(10);
        let payload = r#"{"tripId":"17","seatCount":2,"eventId":"booking-1"}"#;

        reconciler.reconcile(&message("seats_reserved", 0, payload)).await.unwrap();
        // Mismo evento reenviado por el productor con otro offset
        let again = reconciler.reconcile(&message("seats_reserved", 5, payload)).await.unwrap();

        assert_eq!(again, ReconcileOutcome::Duplicate);
        assert_eq!(store.trip(17).unwrap().stock, 8);
    }

    #[tokio::test]
    async fn test_invalid_messages_are_skipped_without_touching_stock() {
        let (store, reconciler) = setup(10);

        for (offset, payload) in [
            (0, "not json"),
            (1, r#"{"tripId":"abc","seatCount":1}"#),
            (2, r#"{"tripId":"17","seatCount":-3}"#),
        ] {
            let outcome = reconciler.reconcile(&message("seats_reserved", offset, payload)).await.unwrap();
            assert!(matches!(outcome, ReconcileOutcome::Skipped(_)));
        }
        assert_eq!(store.trip(17).unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_unknown_trip_is_dropped() {
        let (_store, reconciler) = setup(10);
        let outcome = reconciler
            .reconcile(&message("seats_released", 0, r#"{"tripId":"404","seatCount":1}"#))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::UnknownTrip(404));
    }

    #[tokio::test]
    async fn test_out_of_range_stock_is_still_applied() {
        let (store, reconciler) = setup(1);
        let outcome = reconciler
            .reconcile(&message("seats_reserved", 0, r#"{"tripId":" 17 ","seatCount":3}"#))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                trip_id: 17,
                stock: -2,
                total: 10
            }
        );
        assert_eq!(store.trip(17).unwrap().stock, -2);
    }
}
