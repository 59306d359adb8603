//! Repositorios
//!
//! Acceso a datos del servicio de viajes. Cada almacén se expone como trait
//! para que los servicios reciban la implementación por inyección:
//! PostgreSQL en producción y memoria en las pruebas.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    NewStop, NewTrip, NewTripLog, Route, ScheduleWindow, StockUpdate, Stop, Trip, TripInfo,
    TripLogEntry, TripSearchQuery, TripStatus, Vehicle,
};
use crate::utils::errors::AppResult;

pub mod memory;
pub mod stop_repository;
pub mod trip_repository;

pub use memory::InMemoryStore;
pub use stop_repository::StopRepository;
pub use trip_repository::TripRepository;

/// Almacén de viajes, su auditoría y sus consultas de lectura
#[async_trait]
pub trait TripStore: Send + Sync {
    async fn find_all(&self) -> AppResult<Vec<Trip>>;

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Trip>>;

    /// Viajes en cualquiera de los estados, en el orden de `statuses`
    async fn find_by_status_in(&self, statuses: &[TripStatus]) -> AppResult<Vec<Trip>>;

    async fn find_by_driver(&self, driver_id: i32) -> AppResult<Vec<Trip>>;

    /// Primer viaje no cancelado del conductor que se cruza con la ventana
    async fn find_conflicting_trip_for_driver(
        &self,
        driver_id: i32,
        window: &ScheduleWindow,
        exclude_trip_id: Option<i32>,
    ) -> AppResult<Option<Trip>>;

    async fn find_vehicle(&self, vehicle_id: i32) -> AppResult<Option<Vehicle>>;

    async fn insert(&self, trip: &NewTrip) -> AppResult<Trip>;

    /// Reemplaza los campos editables; conserva estado y datos de creación.
    /// `trip.stock` se ignora: el stock solo se desplaza por la diferencia
    /// entre el total nuevo y el guardado.
    async fn update(&self, id: i32, trip: &NewTrip) -> AppResult<Option<Trip>>;

    async fn delete(&self, id: i32) -> AppResult<bool>;

    /// `stock := stock + delta` en una sola operación atómica, registrando
    /// `dedup_key` en la misma transacción
    async fn apply_stock_delta(&self, trip_id: i32, delta: i32, dedup_key: &str) -> AppResult<StockUpdate>;

    /// Olvida las claves de deduplicación aplicadas antes de `applied_before`
    async fn prune_processed_seat_events(&self, applied_before: DateTime<Utc>) -> AppResult<u64>;

    /// Persiste el nuevo estado y su fila de auditoría juntos
    async fn update_status_logged(&self, trip_id: i32, status: TripStatus, log: &NewTripLog) -> AppResult<()>;

    async fn append_log(&self, log: &NewTripLog) -> AppResult<()>;

    async fn find_logs(&self, trip_id: i32) -> AppResult<Vec<TripLogEntry>>;

    async fn search_trip_infos(&self, query: &TripSearchQuery) -> AppResult<Vec<TripInfo>>;

    async fn find_trip_info(&self, trip_id: i32) -> AppResult<Option<TripInfo>>;

    async fn find_route_trip_infos(&self, route_id: i32, departure_date: NaiveDate, min_seats: i32) -> AppResult<Vec<TripInfo>>;
}

/// Almacén de paradas de las rutas
#[async_trait]
pub trait StopStore: Send + Sync {
    async fn find_route(&self, route_id: i32) -> AppResult<Option<Route>>;

    async fn find_by_route(&self, route_id: i32) -> AppResult<Vec<Stop>>;

    async fn find_by_route_and_path(&self, route_id: i32, path_id: i32) -> AppResult<Vec<Stop>>;

    async fn insert(&self, stop: &NewStop) -> AppResult<Stop>;
}
