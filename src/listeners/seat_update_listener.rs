//! Listener de reservas y liberaciones de asientos

use std::sync::Arc;

use async_trait::async_trait;

use crate::messaging::{topics, BusMessage};
use crate::services::seat_inventory_reconciler::SeatInventoryReconciler;
use crate::utils::errors::AppResult;

use super::consumer_loop::MessageHandler;

pub const GROUP_ID: &str = "trip_seat_updater";
pub const TOPICS: &[&str] = &[topics::SEATS_RESERVED, topics::SEATS_RELEASED];

pub struct SeatUpdateListener {
    reconciler: Arc<SeatInventoryReconciler>,
}

impl SeatUpdateListener {
    pub fn new(reconciler: Arc<SeatInventoryReconciler>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl MessageHandler for SeatUpdateListener {
    fn name(&self) -> &'static str {
        "seat-update-listener"
    }

    async fn handle(&self, message: &BusMessage) -> AppResult<()> {
        self.reconciler.reconcile(message).await.map(|_| ())
    }
}
