//! Configuración del proyecto
//! 
//! Este módulo contiene la configuración de base de datos, del broker de
//! mensajes, de los listeners y las variables de entorno del servidor.

pub mod database;
pub mod environment;
pub mod kafka;
pub mod listener;

use std::str::FromStr;

use anyhow::{Context, Result};

pub use database::DatabaseConfig;
pub use environment::EnvironmentConfig;
pub use kafka::KafkaConfig;
pub use listener::ListenerConfig;

/// Configuración completa del servicio
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: EnvironmentConfig,
    pub database: DatabaseConfig,
    pub kafka: KafkaConfig,
    pub listeners: ListenerConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            environment: EnvironmentConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            kafka: KafkaConfig::from_env()?,
            listeners: ListenerConfig::from_env()?,
        })
    }
}

/// Lee una variable de entorno o usa el valor por defecto
pub(crate) fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} must be a valid value: {}", key, e)),
        _ => Ok(default),
    }
}

pub(crate) fn env_required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} must be set in environment variables", key))
}

pub(crate) fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
