//! Difusión en tiempo real
//!
//! Un canal `broadcast` por tópico. Los listeners publican JSON ya
//! serializado y cada cliente WebSocket recibe su propia copia.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::utils::errors::AppResult;

/// Tópico con la lista de viajes "no ha salido" + "salió"
pub const TRIP_UPDATES_TOPIC: &str = "/topic/trip-updates";

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone, Default)]
pub struct RealtimeHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<String>>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publica un mensaje; devuelve cuántos suscriptores lo recibieron
    pub async fn publish(&self, topic: &str, message: String) -> usize {
        let mut channels = self.channels.write().await;
        let sender = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);

        // Sin suscriptores el envío falla; no es un error
        let delivered = sender.send(message).unwrap_or(0);
        debug!("📣 Mensaje en '{}' entregado a {} suscriptores", topic, delivered);
        delivered
    }

    pub async fn publish_json<T: Serialize>(&self, topic: &str, payload: &T) -> AppResult<usize> {
        let message = serde_json::to_string(payload)?;
        Ok(self.publish(topic, message).await)
    }

    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<String> {
        let mut channels = self.channels.write().await;
        channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}
