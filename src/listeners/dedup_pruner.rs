//! Limpieza periódica de las claves de deduplicación de asientos

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::services::seat_inventory_reconciler::SeatInventoryReconciler;

pub struct DedupPruner {
    reconciler: Arc<SeatInventoryReconciler>,
    retention: Duration,
    interval: Duration,
}

impl DedupPruner {
    pub fn new(reconciler: Arc<SeatInventoryReconciler>, retention: Duration, interval: Duration) -> Self {
        Self {
            reconciler,
            retention,
            interval,
        }
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Poda al arrancar y luego en cada intervalo hasta la señal de apagado
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "🧹 Poda de eventos de asientos cada {:?} (retención {:?})",
            self.interval, self.retention
        );

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.reconciler.prune_processed(self.retention).await {
                        warn!("⚠️ No se pudieron podar los eventos de asientos: {}", e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StockUpdate, Trip, TripStatus};
    use crate::repositories::{InMemoryStore, TripStore};
    use chrono::Utc;

    fn trip() -> Trip {
        Trip {
            id: 17,
            departure_date: None,
            departure_time: None,
            arrival_date: None,
            arrival_time: None,
            vehicle_id: 1,
            route_id: 1,
            pickup_id: "10".into(),
            driver_id: None,
            total: 10,
            stock: 10,
            status: TripStatus::NotDeparted.code(),
            created_at: Utc::now(),
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_expired_keys_are_pruned_until_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        store.add_trip(trip());
        store.apply_stock_delta(17, -2, "seats_reserved:0:0").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let reconciler = Arc::new(SeatInventoryReconciler::new(store.clone()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = DedupPruner::new(reconciler, Duration::ZERO, Duration::from_millis(10)).spawn(shutdown_rx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        // La clave olvidada vuelve a aplicarse
        assert_eq!(
            store.apply_stock_delta(17, -2, "seats_reserved:0:0").await.unwrap(),
            StockUpdate::Applied { stock: 6, total: 10 }
        );
    }
}
