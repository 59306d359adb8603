//! Mensajería
//!
//! Cliente de broker inyectado. `EventBus` publica y abre suscripciones;
//! `Subscription` entrega lotes acotados y confirma posiciones solo cuando
//! el consumidor lo pide. La implementación de producción usa Kafka y las
//! pruebas usan el bus en memoria.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod kafka;
pub mod memory;
pub mod publisher;

pub use kafka::KafkaEventBus;
pub use memory::InMemoryEventBus;
pub use publisher::EventPublisher;

/// Nombres de los tópicos
pub mod topics {
    pub const SEATS_RESERVED: &str = "seats_reserved";
    pub const SEATS_RELEASED: &str = "seats_released";
    pub const TRIP_CREATED: &str = "trip_created";
    pub const TRIP_STATUS_UPDATED: &str = "trip_status_updated";
    pub const TRIP_SEARCH: &str = "trip_search";
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("broker connection failed: {0}")]
    Connection(String),

    #[error("publish to '{topic}' failed: {reason}")]
    Publish { topic: String, reason: String },

    #[error("subscription to {topics:?} failed: {reason}")]
    Subscribe { topics: Vec<String>, reason: String },

    #[error("poll failed: {0}")]
    Poll(String),

    #[error("commit failed: {0}")]
    Commit(String),

    #[error("event bus is closed")]
    Closed,
}

impl BusError {
    /// Errores de E/S que vale la pena reintentar
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BusError::Connection(_) | BusError::Publish { .. } | BusError::Poll(_) | BusError::Commit(_)
        )
    }
}

/// Mensaje recibido, ya copiado fuera del buffer del cliente
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
}

impl BusMessage {
    /// Coordenadas del broker; idénticas en cada reentrega del mismo mensaje
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.topic, self.partition, self.offset)
    }
}

#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, key: Option<&str>, payload: Vec<u8>) -> Result<(), BusError>;

    async fn subscribe(&self, group_id: &str, topics: &[&str]) -> Result<Box<dyn Subscription>, BusError>;

    /// Vacía lo pendiente de publicar y rechaza publicaciones posteriores
    async fn shutdown(&self, grace: Duration) -> Result<(), BusError>;
}

#[async_trait]
pub trait Subscription: Send {
    /// Hasta `max` mensajes; espera como mucho `timeout` si no hay ninguno
    async fn poll_batch(&mut self, max: usize, timeout: Duration) -> Result<Vec<BusMessage>, BusError>;

    /// Confirma todo lo entregado desde la última confirmación
    async fn commit(&mut self) -> Result<(), BusError>;

    /// Vuelve a la última posición confirmada
    async fn rewind(&mut self) -> Result<(), BusError>;

    async fn close(&mut self, grace: Duration);
}
