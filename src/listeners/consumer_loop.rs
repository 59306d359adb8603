//! Bucle de consumo cancelable
//!
//! Cada listener corre en su propia tarea: pide lotes acotados, los aplica en
//! orden y confirma la posición solo después del lote completo. Un error
//! transitorio devuelve el consumidor a la última posición confirmada y
//! reintenta con espera exponencial; cualquier otro error salta el mensaje.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ListenerConfig;
use crate::messaging::{BusMessage, EventBus, Subscription};
use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, message: &BusMessage) -> AppResult<()>;
}

pub struct ConsumerLoop {
    bus: Arc<dyn EventBus>,
    group_id: &'static str,
    topics: &'static [&'static str],
    config: ListenerConfig,
    handler: Arc<dyn MessageHandler>,
}

impl ConsumerLoop {
    pub fn new(
        bus: Arc<dyn EventBus>,
        group_id: &'static str,
        topics: &'static [&'static str],
        config: ListenerConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            bus,
            group_id,
            topics,
            config,
            handler,
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let name = self.handler.name();
        let Some(mut subscription) = self.open(&mut shutdown).await else {
            return;
        };
        info!("🎧 {} escuchando {:?} (grupo {})", name, self.topics, self.group_id);

        let mut failures: u32 = 0;
        while !*shutdown.borrow() {
            let polled = tokio::select! {
                _ = shutdown.changed() => break,
                polled = subscription.poll_batch(self.config.max_batch, self.config.poll_timeout) => polled,
            };

            let batch = match polled {
                Ok(batch) => batch,
                Err(e) => {
                    failures += 1;
                    warn!("⚠️ {}: error leyendo del broker (intento {}): {}", name, failures, e);
                    if !pause(&mut shutdown, self.config.backoff(failures)).await {
                        break;
                    }
                    continue;
                }
            };
            if batch.is_empty() {
                continue;
            }

            match self.apply(&batch).await {
                Ok(()) => {
                    failures = 0;
                    if let Err(e) = subscription.commit().await {
                        // Lo aplicado se reentregará y la deduplicación lo absorbe
                        warn!("⚠️ {}: no se pudo confirmar el lote: {}", name, e);
                    } else {
                        debug!("✅ {}: lote de {} mensajes confirmado", name, batch.len());
                    }
                }
                Err(e) => {
                    failures += 1;
                    let delay = self.config.backoff(failures);
                    warn!(
                        "🔁 {}: error transitorio, se reintenta el lote en {:?} (intento {}): {}",
                        name, delay, failures, e
                    );
                    if let Err(e) = subscription.rewind().await {
                        error!("❌ {}: no se pudo rebobinar el consumidor: {}", name, e);
                    }
                    if !pause(&mut shutdown, delay).await {
                        break;
                    }
                }
            }
        }

        subscription.close(self.config.close_grace).await;
        info!("🛑 {} detenido", name);
    }

    /// Suscribe reintentando mientras el broker no esté disponible
    async fn open(&self, shutdown: &mut watch::Receiver<bool>) -> Option<Box<dyn Subscription>> {
        let name = self.handler.name();
        let mut attempt: u32 = 0;
        loop {
            if *shutdown.borrow() {
                return None;
            }
            match self.bus.subscribe(self.group_id, self.topics).await {
                Ok(subscription) => return Some(subscription),
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    warn!("⚠️ {}: suscripción fallida (intento {}): {}", name, attempt, e);
                    if !pause(shutdown, self.config.backoff(attempt)).await {
                        return None;
                    }
                }
                Err(e) => {
                    error!("❌ {}: no se pudo suscribir: {}", name, e);
                    return None;
                }
            }
        }
    }

    /// Aplica el lote en orden; solo un error transitorio lo interrumpe
    async fn apply(&self, batch: &[BusMessage]) -> Result<(), AppError> {
        for message in batch {
            match self.handler.handle(message).await {
                Ok(()) => {}
                Err(e) if e.is_transient() => return Err(e),
                Err(e) => warn!(
                    "⚠️ {}: mensaje {} saltado: {}",
                    self.handler.name(),
                    message.coordinates(),
                    e
                ),
            }
        }
        Ok(())
    }
}

/// Espera `delay` salvo que llegue la señal de apagado; `false` si hay que salir
async fn pause(shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        _ = shutdown.changed() => !*shutdown.borrow(),
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryEventBus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Falla de forma transitoria las primeras `failures` veces
    struct FlakyHandler {
        failures: AtomicUsize,
        seen: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl MessageHandler for FlakyHandler {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn handle(&self, message: &BusMessage) -> AppResult<()> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(AppError::Database(sqlx::Error::PoolTimedOut));
            }
            if message.payload == b"bad" {
                return Err(AppError::BadRequest("bad payload".into()));
            }
            self.seen.lock().unwrap().push(message.offset);
            Ok(())
        }
    }

    fn quick_config() -> ListenerConfig {
        ListenerConfig {
            max_batch: 10,
            poll_timeout: Duration::from_millis(20),
            close_grace: Duration::from_millis(50),
            retry_initial_backoff: Duration::from_millis(5),
            retry_max_backoff: Duration::from_millis(20),
            ..ListenerConfig::default()
        }
    }

    async fn wait_for_commit(bus: &InMemoryEventBus, group: &str, topic: &str, offset: i64) {
        for _ in 0..200 {
            if bus.committed_offset(group, topic) >= offset {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("offset {offset} never committed");
    }

    #[tokio::test]
    async fn test_transient_failure_rewinds_and_retries_the_batch() {
        let bus = InMemoryEventBus::new();
        for payload in [&b"a"[..], &b"bad"[..], &b"c"[..]] {
            bus.publish("t", None, payload.to_vec()).await.unwrap();
        }

        let handler = Arc::new(FlakyHandler {
            failures: AtomicUsize::new(1),
            seen: Mutex::new(Vec::new()),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ConsumerLoop::new(Arc::new(bus.clone()), "g", &["t"], quick_config(), handler.clone())
            .spawn(shutdown_rx);

        wait_for_commit(&bus, "g", "t", 3).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        // El mensaje inválido se salta; los demás se aplican tras el reintento
        assert_eq!(*handler.seen.lock().unwrap(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_an_idle_loop() {
        let bus = InMemoryEventBus::new();
        let handler = Arc::new(FlakyHandler {
            failures: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ConsumerLoop::new(Arc::new(bus), "g", &["t"], quick_config(), handler).spawn(shutdown_rx);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop did not stop")
            .unwrap();
    }
}
