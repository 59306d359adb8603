//! Configuración del cliente Kafka
//!
//! Servidores, protocolo de seguridad y credenciales SASL opcionales.

use std::time::Duration;

use anyhow::Result;

use super::{env_optional, env_or};

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub bootstrap_servers: String,
    pub security_protocol: String,
    pub sasl_mechanism: Option<String>,
    pub sasl_username: Option<String>,
    pub sasl_password: Option<String>,
    /// Dónde empieza un grupo sin posición confirmada
    pub auto_offset_reset: String,
    pub producer_acks: String,
    pub publish_timeout: Duration,
    pub session_timeout: Duration,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            security_protocol: "PLAINTEXT".to_string(),
            sasl_mechanism: None,
            sasl_username: None,
            sasl_password: None,
            auto_offset_reset: "earliest".to_string(),
            producer_acks: "all".to_string(),
            publish_timeout: Duration::from_secs(5),
            session_timeout: Duration::from_secs(10),
        }
    }
}

impl KafkaConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bootstrap_servers: env_or("KAFKA_BOOTSTRAP_SERVERS", defaults.bootstrap_servers)?,
            security_protocol: env_or("KAFKA_SECURITY_PROTOCOL", defaults.security_protocol)?,
            sasl_mechanism: env_optional("KAFKA_SASL_MECHANISM"),
            sasl_username: env_optional("KAFKA_SASL_USERNAME"),
            sasl_password: env_optional("KAFKA_SASL_PASSWORD"),
            auto_offset_reset: env_or("KAFKA_AUTO_OFFSET_RESET", defaults.auto_offset_reset)?,
            producer_acks: env_or("KAFKA_PRODUCER_ACKS", defaults.producer_acks)?,
            publish_timeout: Duration::from_millis(env_or("KAFKA_PUBLISH_TIMEOUT_MS", 5_000)?),
            session_timeout: Duration::from_millis(env_or("KAFKA_SESSION_TIMEOUT_MS", 10_000)?),
        })
    }
}
