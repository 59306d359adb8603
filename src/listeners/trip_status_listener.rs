//! Listener de cambios de estado
//!
//! Cuando un viaje pasa de "no ha salido" a "salió" se difunde a los clientes
//! en tiempo real la lista actual de viajes en esos dos estados. Cualquier
//! otra transición se ignora.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::messaging::{topics, BusMessage};
use crate::models::events::TripStatusUpdateEvent;
use crate::models::TripStatus;
use crate::realtime::{RealtimeHub, TRIP_UPDATES_TOPIC};
use crate::repositories::TripStore;
use crate::utils::errors::AppResult;

use super::consumer_loop::MessageHandler;

pub const GROUP_ID: &str = "trip_status_websocket_group";
pub const TOPICS: &[&str] = &[topics::TRIP_STATUS_UPDATED];

pub struct TripStatusListener {
    trips: Arc<dyn TripStore>,
    hub: RealtimeHub,
}

impl TripStatusListener {
    pub fn new(trips: Arc<dyn TripStore>, hub: RealtimeHub) -> Self {
        Self { trips, hub }
    }
}

#[async_trait]
impl MessageHandler for TripStatusListener {
    fn name(&self) -> &'static str {
        "trip-status-listener"
    }

    async fn handle(&self, message: &BusMessage) -> AppResult<()> {
        let event: TripStatusUpdateEvent = match serde_json::from_slice(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("⚠️ Evento de estado ilegible en {}: {}", message.coordinates(), e);
                return Ok(());
            }
        };

        if !event.is_departure() {
            debug!(
                "⏭️ Viaje {}: transición {:?} → {} sin difusión",
                event.trip_id, event.old_status, event.new_status
            );
            return Ok(());
        }

        let active = self
            .trips
            .find_by_status_in(&[TripStatus::NotDeparted, TripStatus::Departed])
            .await?;
        let delivered = self.hub.publish_json(TRIP_UPDATES_TOPIC, &active).await?;
        info!(
            "📡 Viaje {} salió; {} viajes activos difundidos a {} clientes",
            event.trip_id,
            active.len(),
            delivered
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Trip;
    use crate::repositories::InMemoryStore;
    use chrono::Utc;

    fn trip(id: i32, status: TripStatus) -> Trip {
        Trip {
            id,
            departure_date: None,
            departure_time: None,
            arrival_date: None,
            arrival_time: None,
            vehicle_id: 1,
            route_id: 1,
            pickup_id: "10".into(),
            driver_id: None,
            total: 20,
            stock: 20,
            status: status.code(),
            created_at: Utc::now(),
            created_by: None,
        }
    }

    fn message(payload: &str) -> BusMessage {
        BusMessage {
            topic: topics::TRIP_STATUS_UPDATED.to_string(),
            partition: 0,
            offset: 0,
            key: None,
            payload: payload.as_bytes().to_vec(),
        }
    }

    fn listener() -> (RealtimeHub, TripStatusListener) {
        let store = Arc::new(InMemoryStore::new());
        store.add_trip(trip(1, TripStatus::NotDeparted));
        store.add_trip(trip(2, TripStatus::Departed));
        store.add_trip(trip(3, TripStatus::Arrived));
        store.add_trip(trip(4, TripStatus::NotDeparted));
        let hub = RealtimeHub::new();
        (hub.clone(), TripStatusListener::new(store, hub))
    }

    #[tokio::test]
    async fn test_departure_broadcasts_not_departed_then_departed() {
        let (hub, listener) = listener();
        let mut rx = hub.subscribe(TRIP_UPDATES_TOPIC).await;

        listener
            .handle(&message(
                r#"{"tripId":2,"oldStatus":0,"newStatus":1,"updatedBy":5,"updatedAt":"2024-05-01T10:00:00Z"}"#,
            ))
            .await
            .unwrap();

        let body: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        let ids: Vec<i64> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 4, 2]);
    }

    #[tokio::test]
    async fn test_other_transitions_are_ignored() {
        let (hub, listener) = listener();
        let mut rx = hub.subscribe(TRIP_UPDATES_TOPIC).await;

        listener
            .handle(&message(
                r#"{"tripId":2,"oldStatus":1,"newStatus":2,"updatedBy":null,"updatedAt":"2024-05-01T10:00:00Z"}"#,
            ))
            .await
            .unwrap();
        listener.handle(&message("garbage")).await.unwrap();

        assert!(rx.try_recv().is_err());
    }
}
