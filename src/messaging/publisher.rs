use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::EventBus;

/// Emisión de eventos sin esperar al broker
///
/// El evento se serializa en el momento y el envío corre en su propia tarea;
/// el resultado solo se registra. El `JoinHandle` devuelto permite esperarlo
/// cuando hace falta (pruebas, apagado).
#[derive(Clone)]
pub struct EventPublisher {
    bus: Arc<dyn EventBus>,
}

impl EventPublisher {
    pub fn new(bus: Arc<dyn EventBus>) -> Self {
        Self { bus }
    }

    pub fn emit<T: Serialize>(&self, topic: &'static str, key: Option<String>, event: &T) -> JoinHandle<()> {
        let payload = serde_json::to_vec(event);
        let bus = Arc::clone(&self.bus);

        tokio::spawn(async move {
            let payload = match payload {
                Ok(payload) => payload,
                Err(e) => {
                    error!("❌ No se pudo serializar el evento para '{}': {}", topic, e);
                    return;
                }
            };
            match bus.publish(topic, key.as_deref(), payload).await {
                Ok(()) => debug!("📤 Evento enviado a '{}' (key: {:?})", topic, key),
                Err(e) => error!("❌ Error enviando evento a '{}': {}", topic, e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryEventBus;
    use crate::models::events::TripCreatedEvent;

    #[tokio::test]
    async fn test_emit_publishes_camel_case_json_keyed_by_trip() {
        let bus = InMemoryEventBus::new();
        let publisher = EventPublisher::new(Arc::new(bus.clone()));

        let event = TripCreatedEvent {
            trip_id: "42".into(),
            total_seats: 30,
            creation_timestamp: chrono::Utc::now(),
        };
        publisher.emit("trip_created", Some("42".into()), &event).await.unwrap();

        let messages = bus.messages("trip_created");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].key.as_deref(), Some("42"));
        let json: serde_json::Value = serde_json::from_slice(&messages[0].payload).unwrap();
        assert_eq!(json["tripId"], "42");
        assert_eq!(json["totalSeats"], 30);
    }

    #[tokio::test]
    async fn test_emit_on_closed_bus_only_logs() {
        let bus = InMemoryEventBus::new();
        bus.shutdown(std::time::Duration::from_millis(1)).await.unwrap();
        let publisher = EventPublisher::new(Arc::new(bus.clone()));

        publisher.emit("trip_search", None, &serde_json::json!({"a": 1})).await.unwrap();
        assert!(bus.messages("trip_search").is_empty());
    }
}
