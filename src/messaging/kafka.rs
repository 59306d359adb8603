//! Bus de eventos sobre Kafka (rdkafka)
//!
//! Productor compartido para todas las publicaciones y un `StreamConsumer`
//! por suscripción, con confirmación manual de offsets.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::{Message, Offset, TopicPartitionList};
use tracing::{debug, error, info, warn};

use super::{BusError, BusMessage, EventBus, Subscription};
use crate::config::KafkaConfig;

pub struct KafkaEventBus {
    config: KafkaConfig,
    producer: FutureProducer,
    closed: AtomicBool,
}

impl KafkaEventBus {
    pub fn new(config: KafkaConfig) -> Result<Self, BusError> {
        let mut producer_config = base_client_config(&config);
        producer_config
            .set("message.timeout.ms", config.publish_timeout.as_millis().to_string())
            .set("acks", &config.producer_acks);

        let producer: FutureProducer = producer_config
            .create()
            .map_err(|e| BusError::Connection(format!("Failed to create producer: {e}")))?;

        info!(
            brokers = %config.bootstrap_servers,
            security_protocol = %config.security_protocol,
            acks = %config.producer_acks,
            "📡 Productor Kafka creado"
        );

        Ok(Self {
            config,
            producer,
            closed: AtomicBool::new(false),
        })
    }
}

fn base_client_config(config: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", &config.bootstrap_servers)
        .set("security.protocol", &config.security_protocol);

    if let Some(mechanism) = &config.sasl_mechanism {
        client.set("sasl.mechanism", mechanism);
    }
    if let (Some(username), Some(password)) = (&config.sasl_username, &config.sasl_password) {
        client
            .set("sasl.username", username)
            .set("sasl.password", password);
    }
    client
}

#[async_trait]
impl EventBus for KafkaEventBus {
    async fn publish(&self, topic: &str, key: Option<&str>, payload: Vec<u8>) -> Result<(), BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }

        let mut record = FutureRecord::<str, [u8]>::to(topic).payload(&payload);
        if let Some(key) = key {
            record = record.key(key);
        }

        match self
            .producer
            .send(record, Timeout::After(self.config.publish_timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(topic = %topic, partition, offset, "📤 Evento publicado");
                Ok(())
            }
            Err((kafka_error, _)) => {
                error!(topic = %topic, error = %kafka_error, "❌ Error publicando evento");
                Err(BusError::Publish {
                    topic: topic.to_string(),
                    reason: kafka_error.to_string(),
                })
            }
        }
    }

    async fn subscribe(&self, group_id: &str, topics: &[&str]) -> Result<Box<dyn Subscription>, BusError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }

        let topic_names: Vec<String> = topics.iter().map(|t| t.to_string()).collect();
        let subscribe_error = |reason: String| BusError::Subscribe {
            topics: topic_names.clone(),
            reason,
        };

        let consumer: StreamConsumer = base_client_config(&self.config)
            .set("group.id", group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &self.config.auto_offset_reset)
            .set("session.timeout.ms", self.config.session_timeout.as_millis().to_string())
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| subscribe_error(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(topics)
            .map_err(|e| subscribe_error(format!("Failed to subscribe to topics: {e}")))?;

        info!(
            topics = ?topic_names,
            group_id = %group_id,
            auto_offset_reset = %self.config.auto_offset_reset,
            manual_commit = true,
            "📥 Suscripción Kafka abierta"
        );

        Ok(Box::new(KafkaSubscription {
            consumer: Some(consumer),
            group_id: group_id.to_string(),
            pending: HashMap::new(),
        }))
    }

    async fn shutdown(&self, grace: Duration) -> Result<(), BusError> {
        self.closed.store(true, Ordering::Release);
        self.producer
            .flush(Timeout::After(grace))
            .map_err(|e| BusError::Connection(format!("Failed to flush producer: {e}")))?;
        info!("🛑 Productor Kafka vaciado y cerrado");
        Ok(())
    }
}

/// Rango de offsets entregados y aún no confirmados de una partición
#[derive(Debug, Clone, Copy)]
struct PendingRange {
    first: i64,
    last: i64,
}

struct KafkaSubscription {
    consumer: Option<StreamConsumer>,
    group_id: String,
    pending: HashMap<(String, i32), PendingRange>,
}

impl KafkaSubscription {
    fn consumer(&self) -> Result<&StreamConsumer, BusError> {
        self.consumer.as_ref().ok_or(BusError::Closed)
    }

    fn track(&mut self, message: &BusMessage) {
        self.pending
            .entry((message.topic.clone(), message.partition))
            .and_modify(|range| range.last = range.last.max(message.offset))
            .or_insert(PendingRange {
                first: message.offset,
                last: message.offset,
            });
    }
}

#[async_trait]
impl Subscription for KafkaSubscription {
    async fn poll_batch(&mut self, max: usize, timeout: Duration) -> Result<Vec<BusMessage>, BusError> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut batch = Vec::new();

        while batch.len() < max {
            let consumer = self.consumer()?;
            let received = match tokio::time::timeout_at(deadline, consumer.recv()).await {
                Err(_) => break,
                Ok(Err(e)) => return Err(BusError::Poll(e.to_string())),
                Ok(Ok(message)) => BusMessage {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                    key: message.key().map(|k| String::from_utf8_lossy(k).into_owned()),
                    payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
                },
            };
            self.track(&received);
            batch.push(received);
        }

        Ok(batch)
    }

    async fn commit(&mut self) -> Result<(), BusError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut positions = TopicPartitionList::new();
        for ((topic, partition), range) in &self.pending {
            positions
                .add_partition_offset(topic, *partition, Offset::Offset(range.last + 1))
                .map_err(|e| BusError::Commit(e.to_string()))?;
        }

        self.consumer()?
            .commit(&positions, CommitMode::Sync)
            .map_err(|e| BusError::Commit(e.to_string()))?;

        debug!(group_id = %self.group_id, partitions = self.pending.len(), "✅ Offsets confirmados");
        self.pending.clear();
        Ok(())
    }

    async fn rewind(&mut self) -> Result<(), BusError> {
        let consumer = self.consumer()?;
        for ((topic, partition), range) in &self.pending {
            consumer
                .seek(topic, *partition, Offset::Offset(range.first), Duration::from_secs(5))
                .map_err(|e| BusError::Poll(format!("Failed to seek {topic}:{partition}: {e}")))?;
        }
        warn!(
            group_id = %self.group_id,
            partitions = self.pending.len(),
            "⏪ Consumidor devuelto a la última posición confirmada"
        );
        self.pending.clear();
        Ok(())
    }

    async fn close(&mut self, grace: Duration) {
        let Some(consumer) = self.consumer.take() else {
            return;
        };
        consumer.unsubscribe();

        // Al soltar el consumidor se abandona el grupo; puede bloquear
        let closing = tokio::task::spawn_blocking(move || drop(consumer));
        match tokio::time::timeout(grace, closing).await {
            Ok(_) => info!(group_id = %self.group_id, "🔌 Consumidor Kafka cerrado"),
            Err(_) => warn!(group_id = %self.group_id, "⚠️ Cierre del consumidor excedió el tiempo de gracia"),
        }
    }
}
