//! Bus de eventos en memoria
//!
//! Un registro por tópico (partición 0) y posiciones confirmadas por
//! `(grupo, tópico)`, con la misma semántica de confirmación manual que Kafka.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::{BusError, BusMessage, EventBus, Subscription};

#[derive(Default)]
struct BusState {
    logs: HashMap<String, Vec<BusMessage>>,
    committed: HashMap<(String, String), i64>,
    closed: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<BusState>,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> Result<MutexGuard<'_, BusState>, BusError> {
        self.state
            .lock()
            .map_err(|_| BusError::Connection("in-memory bus poisoned".to_string()))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    shared: Arc<Shared>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Todo lo publicado en un tópico, en orden
    pub fn messages(&self, topic: &str) -> Vec<BusMessage> {
        self.shared
            .lock()
            .ok()
            .and_then(|state| state.logs.get(topic).cloned())
            .unwrap_or_default()
    }

    /// Próximo offset que leerá el grupo en el tópico
    pub fn committed_offset(&self, group_id: &str, topic: &str) -> i64 {
        self.shared
            .lock()
            .ok()
            .and_then(|state| state.committed.get(&(group_id.to_string(), topic.to_string())).copied())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, topic: &str, key: Option<&str>, payload: Vec<u8>) -> Result<(), BusError> {
        {
            let mut state = self.shared.lock()?;
            if state.closed {
                return Err(BusError::Closed);
            }
            let log = state.logs.entry(topic.to_string()).or_default();
            let offset = log.len() as i64;
            log.push(BusMessage {
                topic: topic.to_string(),
                partition: 0,
                offset,
                key: key.map(str::to_string),
                payload,
            });
        }
        self.shared.notify.notify_waiters();
        Ok(())
    }

    async fn subscribe(&self, group_id: &str, topics: &[&str]) -> Result<Box<dyn Subscription>, BusError> {
        let state = self.shared.lock()?;
        if state.closed {
            return Err(BusError::Closed);
        }
        let positions = topics
            .iter()
            .map(|topic| {
                let committed = state
                    .committed
                    .get(&(group_id.to_string(), topic.to_string()))
                    .copied()
                    .unwrap_or(0);
                (topic.to_string(), committed)
            })
            .collect();

        Ok(Box::new(InMemorySubscription {
            shared: Arc::clone(&self.shared),
            group_id: group_id.to_string(),
            positions,
        }))
    }

    async fn shutdown(&self, _grace: Duration) -> Result<(), BusError> {
        self.shared.lock()?.closed = true;
        self.shared.notify.notify_waiters();
        Ok(())
    }
}

struct InMemorySubscription {
    shared: Arc<Shared>,
    group_id: String,
    positions: Vec<(String, i64)>,
}

impl InMemorySubscription {
    fn take(&mut self, max: usize) -> Result<Vec<BusMessage>, BusError> {
        let state = self.shared.lock()?;
        let mut batch = Vec::new();
        for (topic, position) in self.positions.iter_mut() {
            let Some(log) = state.logs.get(topic.as_str()) else {
                continue;
            };
            while batch.len() < max {
                match log.get(*position as usize) {
                    Some(message) => {
                        batch.push(message.clone());
                        *position += 1;
                    }
                    None => break,
                }
            }
        }
        Ok(batch)
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn poll_batch(&mut self, max: usize, timeout: Duration) -> Result<Vec<BusMessage>, BusError> {
        let deadline = Instant::now() + timeout;
        let shared = Arc::clone(&self.shared);
        loop {
            let notified = shared.notify.notified();
            let batch = self.take(max)?;
            if !batch.is_empty() {
                return Ok(batch);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || tokio::time::timeout(remaining, notified).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn commit(&mut self) -> Result<(), BusError> {
        let mut state = self.shared.lock()?;
        for (topic, position) in &self.positions {
            state
                .committed
                .insert((self.group_id.clone(), topic.clone()), *position);
        }
        Ok(())
    }

    async fn rewind(&mut self) -> Result<(), BusError> {
        let state = self.shared.lock()?;
        for (topic, position) in self.positions.iter_mut() {
            *position = state
                .committed
                .get(&(self.group_id.clone(), topic.clone()))
                .copied()
                .unwrap_or(0);
        }
        Ok(())
    }

    async fn close(&mut self, _grace: Duration) {
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_messages_are_redelivered_after_rewind() {
        let bus = InMemoryEventBus::new();
        bus.publish("seats_reserved", Some("1"), b"a".to_vec()).await.unwrap();
        bus.publish("seats_reserved", Some("1"), b"b".to_vec()).await.unwrap();

        let mut sub = bus.subscribe("g", &["seats_reserved"]).await.unwrap();
        let batch = sub.poll_batch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(batch.len(), 2);

        sub.rewind().await.unwrap();
        let again = sub.poll_batch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(again, batch);

        sub.commit().await.unwrap();
        assert_eq!(bus.committed_offset("g", "seats_reserved"), 2);
        assert!(sub.poll_batch(10, Duration::from_millis(10)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_new_subscription_starts_from_committed_position() {
        let bus = InMemoryEventBus::new();
        for payload in [b"1", b"2", b"3"] {
            bus.publish("t", None, payload.to_vec()).await.unwrap();
        }

        let mut first = bus.subscribe("g", &["t"]).await.unwrap();
        assert_eq!(first.poll_batch(2, Duration::from_millis(10)).await.unwrap().len(), 2);
        first.commit().await.unwrap();
        first.close(Duration::from_millis(10)).await;

        let mut second = bus.subscribe("g", &["t"]).await.unwrap();
        let rest = second.poll_batch(10, Duration::from_millis(10)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].payload, b"3".to_vec());
    }

    #[tokio::test]
    async fn test_poll_wakes_on_publish() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe("g", &["t"]).await.unwrap();

        let publisher = bus.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            publisher.publish("t", None, b"x".to_vec()).await.unwrap();
        });

        let batch = sub.poll_batch(10, Duration::from_secs(2)).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].coordinates(), "t:0:0");
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_fails() {
        let bus = InMemoryEventBus::new();
        bus.shutdown(Duration::from_millis(10)).await.unwrap();
        assert!(matches!(bus.publish("t", None, vec![]).await, Err(BusError::Closed)));
    }
}
