//! Parámetros de los consumidores de larga duración

use std::time::Duration;

use anyhow::Result;

use super::env_or;

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub max_batch: usize,
    pub poll_timeout: Duration,
    /// Tiempo máximo para cerrar una suscripción al apagar
    pub close_grace: Duration,
    pub retry_initial_backoff: Duration,
    pub retry_max_backoff: Duration,
    /// Antigüedad a partir de la cual se olvida una clave de deduplicación.
    /// Debe cubrir el horizonte de reentrega del broker.
    pub dedup_retention: Duration,
    pub dedup_prune_interval: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_batch: 500,
            poll_timeout: Duration::from_millis(1_000),
            close_grace: Duration::from_secs(5),
            retry_initial_backoff: Duration::from_millis(200),
            retry_max_backoff: Duration::from_secs(30),
            dedup_retention: Duration::from_secs(7 * 24 * 3600),
            dedup_prune_interval: Duration::from_secs(3600),
        }
    }
}

impl ListenerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            max_batch: env_or("LISTENER_MAX_BATCH", defaults.max_batch)?.max(1),
            poll_timeout: Duration::from_millis(env_or("LISTENER_POLL_TIMEOUT_MS", 1_000)?),
            close_grace: Duration::from_millis(env_or("LISTENER_CLOSE_GRACE_MS", 5_000)?),
            retry_initial_backoff: Duration::from_millis(env_or("LISTENER_RETRY_INITIAL_MS", 200)?),
            retry_max_backoff: Duration::from_millis(env_or("LISTENER_RETRY_MAX_MS", 30_000)?),
            dedup_retention: Duration::from_secs(env_or("SEAT_EVENT_RETENTION_HOURS", 168u64)?.saturating_mul(3600)),
            dedup_prune_interval: Duration::from_secs(env_or("SEAT_EVENT_PRUNE_INTERVAL_SECS", 3600u64)?.max(1)),
        })
    }

    /// Espera antes del intento `attempt` (desde 1), duplicando hasta el tope
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.retry_initial_backoff
            .saturating_mul(factor)
            .min(self.retry_max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = ListenerConfig {
            retry_initial_backoff: Duration::from_millis(100),
            retry_max_backoff: Duration::from_millis(1_000),
            ..ListenerConfig::default()
        };
        assert_eq!(config.backoff(1), Duration::from_millis(100));
        assert_eq!(config.backoff(2), Duration::from_millis(200));
        assert_eq!(config.backoff(4), Duration::from_millis(800));
        assert_eq!(config.backoff(5), Duration::from_millis(1_000));
        assert_eq!(config.backoff(60), Duration::from_millis(1_000));
    }
}
