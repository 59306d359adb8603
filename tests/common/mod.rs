#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};

use trip_service::config::{EnvironmentConfig, ListenerConfig};
use trip_service::messaging::InMemoryEventBus;
use trip_service::models::{Route, Stop, Trip, TripStatus, Vehicle};
use trip_service::realtime::RealtimeHub;
use trip_service::repositories::InMemoryStore;
use trip_service::state::AppState;

pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub bus: InMemoryEventBus,
    pub hub: RealtimeHub,
    pub state: AppState,
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

pub fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn stop(id: &str, self_id: &str, station_id: i32, station_name: &str) -> Stop {
    Stop {
        id: id.into(),
        route_id: 1,
        self_id: self_id.into(),
        path_id: 1,
        station_id,
        station_name: station_name.into(),
        time: None,
    }
}

/// Ruta 1 (provincia 1 → 2) con el camino Hanoi → Ninh Binh → Vinh y un vehículo de 30 plazas
pub fn seeded_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.add_route(Route {
        id: 1,
        start_province_id: 1,
        end_province_id: 2,
        distance: "320 km".into(),
        estimated_time: "6h".into(),
        price: 250_000,
        status: 1,
    });
    store.add_vehicle(Vehicle {
        id: 3,
        license: "29B-123.45".into(),
        seat_number: 30,
        type_name: "Limousine".into(),
    });
    store.add_stop(stop("10", "-1", 100, "Hanoi"));
    store.add_stop(stop("11", "10", 101, "Ninh Binh"));
    store.add_stop(stop("12", "-2", 102, "Vinh"));
    store
}

pub fn trip(id: i32, status: TripStatus, stock: i32) -> Trip {
    Trip {
        id,
        departure_date: Some(day()),
        departure_time: Some(at(8, 0)),
        arrival_date: Some(day()),
        arrival_time: Some(at(14, 0)),
        vehicle_id: 3,
        route_id: 1,
        pickup_id: "10".into(),
        driver_id: None,
        total: 10,
        stock,
        status: status.code(),
        created_at: Utc::now(),
        created_by: None,
    }
}

pub fn context(config: EnvironmentConfig) -> TestContext {
    let store = seeded_store();
    let bus = InMemoryEventBus::new();
    let hub = RealtimeHub::new();
    let state = AppState::new(config, store.clone(), store.clone(), Arc::new(bus.clone()), hub.clone());
    TestContext { store, bus, hub, state }
}

pub fn quick_listener_config() -> ListenerConfig {
    ListenerConfig {
        max_batch: 50,
        poll_timeout: Duration::from_millis(20),
        close_grace: Duration::from_millis(50),
        retry_initial_backoff: Duration::from_millis(5),
        retry_max_backoff: Duration::from_millis(50),
        ..ListenerConfig::default()
    }
}

/// Reintenta la condición hasta que se cumpla o pasen dos segundos
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}
