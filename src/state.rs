//! Shared application state
//! 
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::environment::EnvironmentConfig;
use crate::messaging::{EventBus, EventPublisher};
use crate::realtime::RealtimeHub;
use crate::repositories::{StopStore, TripStore};
use crate::services::{RoutePathCatalog, StopService, TransitionPolicy, TripService, TripStatusEngine};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub trips: Arc<TripService>,
    pub stops: Arc<StopService>,
    pub status_engine: Arc<TripStatusEngine>,
    pub hub: RealtimeHub,
}

impl AppState {
    /// Construye los servicios sobre los almacenes y el bus inyectados
    pub fn new(
        config: EnvironmentConfig,
        trip_store: Arc<dyn TripStore>,
        stop_store: Arc<dyn StopStore>,
        bus: Arc<dyn EventBus>,
        hub: RealtimeHub,
    ) -> Self {
        let publisher = EventPublisher::new(bus);
        let catalog = Arc::new(RoutePathCatalog::new(stop_store.clone()));
        let policy = TransitionPolicy::from_flag(config.strict_status_transitions);

        Self {
            trips: Arc::new(TripService::new(trip_store.clone(), catalog.clone(), publisher.clone())),
            stops: Arc::new(StopService::new(stop_store, catalog)),
            status_engine: Arc::new(TripStatusEngine::new(trip_store, publisher, policy)),
            hub,
            config,
        }
    }
}
