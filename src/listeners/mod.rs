//! Consumidores de eventos de larga duración
//!
//! Cada listener corre en su propia tarea con su grupo de consumidores y se
//! detiene con una única señal de apagado compartida.

pub mod consumer_loop;
pub mod dedup_pruner;
pub mod seat_update_listener;
pub mod trip_status_listener;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::ListenerConfig;
use crate::messaging::EventBus;
use crate::realtime::RealtimeHub;
use crate::repositories::TripStore;
use crate::services::seat_inventory_reconciler::SeatInventoryReconciler;

pub use consumer_loop::{ConsumerLoop, MessageHandler};
pub use dedup_pruner::DedupPruner;
pub use seat_update_listener::SeatUpdateListener;
pub use trip_status_listener::TripStatusListener;

pub struct ListenerSet {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl ListenerSet {
    /// Arranca el listener de asientos, el de estados y la poda de claves
    pub fn start(
        bus: Arc<dyn EventBus>,
        trips: Arc<dyn TripStore>,
        hub: RealtimeHub,
        config: &ListenerConfig,
    ) -> Self {
        let (shutdown, receiver) = watch::channel(false);
        let reconciler = Arc::new(SeatInventoryReconciler::new(Arc::clone(&trips)));

        let seats = ConsumerLoop::new(
            Arc::clone(&bus),
            seat_update_listener::GROUP_ID,
            seat_update_listener::TOPICS,
            config.clone(),
            Arc::new(SeatUpdateListener::new(Arc::clone(&reconciler))),
        );
        let statuses = ConsumerLoop::new(
            bus,
            trip_status_listener::GROUP_ID,
            trip_status_listener::TOPICS,
            config.clone(),
            Arc::new(TripStatusListener::new(trips, hub)),
        );

        let pruner = DedupPruner::new(reconciler, config.dedup_retention, config.dedup_prune_interval);

        let handles = vec![
            seats.spawn(receiver.clone()),
            statuses.spawn(receiver.clone()),
            pruner.spawn(receiver),
        ];
        info!("🎧 Listeners y poda de deduplicación iniciados");
        Self { shutdown, handles }
    }

    /// Señala el apagado y espera a que cada bucle cierre su suscripción
    pub async fn stop(self) {
        if self.shutdown.send(true).is_err() {
            warn!("⚠️ Los listeners ya habían terminado");
        }
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("⚠️ Listener terminó con error: {}", e);
            }
        }
        info!("🛑 Listeners detenidos");
    }
}
