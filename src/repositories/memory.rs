//! Almacén en memoria
//!
//! Implementa `TripStore` y `StopStore` sobre estructuras protegidas por un
//! mutex. Respeta las mismas reglas que las consultas SQL (deduplicación,
//! exclusión de cancelados, orden de resultados) y se usa en las pruebas.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{StopStore, TripStore};
use crate::models::stop::stop_key;
use crate::models::{
    NewStop, NewTrip, NewTripLog, Route, ScheduleWindow, StockUpdate, Stop, StopLink, Trip, TripInfo,
    TripLogEntry, TripSearchQuery, TripStatus, Vehicle,
};
use crate::utils::errors::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    routes: HashMap<i32, Route>,
    vehicles: HashMap<i32, Vehicle>,
    stations: HashMap<i32, String>,
    stops: Vec<Stop>,
    trips: BTreeMap<i32, Trip>,
    logs: Vec<TripLogEntry>,
    processed: HashMap<String, DateTime<Utc>>,
    next_trip_id: i32,
    next_log_id: i64,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("in-memory store poisoned".to_string()))
    }

    pub fn add_route(&self, route: Route) {
        if let Ok(mut state) = self.lock() {
            state.routes.insert(route.id, route);
        }
    }

    pub fn add_vehicle(&self, vehicle: Vehicle) {
        if let Ok(mut state) = self.lock() {
            state.vehicles.insert(vehicle.id, vehicle);
        }
    }

    pub fn add_station(&self, station_id: i32, name: &str) {
        if let Ok(mut state) = self.lock() {
            state.stations.insert(station_id, name.to_string());
        }
    }

    pub fn add_stop(&self, stop: Stop) {
        if let Ok(mut state) = self.lock() {
            state.stations.entry(stop.station_id).or_insert_with(|| stop.station_name.clone());
            state.stops.push(stop);
        }
    }

    /// Inserta un viaje tal cual, respetando su id
    pub fn add_trip(&self, trip: Trip) {
        if let Ok(mut state) = self.lock() {
            state.next_trip_id = state.next_trip_id.max(trip.id);
            state.trips.insert(trip.id, trip);
        }
    }

    pub fn trip(&self, id: i32) -> Option<Trip> {
        self.lock().ok()?.trips.get(&id).cloned()
    }

    pub fn logs_for(&self, trip_id: i32) -> Vec<TripLogEntry> {
        self.lock()
            .map(|state| state.logs.iter().filter(|l| l.trip_id == trip_id).cloned().collect())
            .unwrap_or_default()
    }
}

impl MemoryState {
    fn push_log(&mut self, log: &NewTripLog) {
        self.next_log_id += 1;
        self.logs.push(TripLogEntry {
            id: self.next_log_id,
            trip_id: log.trip_id,
            updated_at: log.updated_at,
            updated_by: log.updated_by,
        });
    }

    fn trip_info(&self, trip: &Trip) -> Option<TripInfo> {
        let route = self.routes.get(&trip.route_id)?;
        let vehicle = self.vehicles.get(&trip.vehicle_id)?;
        let pickup = stop_key(&trip.pickup_id);
        let origin = self.stops.iter().find(|s| {
            s.route_id == route.id && stop_key(&s.id) == pickup && s.link() == StopLink::Origin
        })?;
        let terminal = self.stops.iter().find(|s| {
            s.route_id == route.id && s.path_id == origin.path_id && s.link() == StopLink::Terminal
        });

        Some(TripInfo {
            trip_id: trip.id,
            vehicle_id: trip.vehicle_id.to_string(),
            license: vehicle.license.clone(),
            vehicle_type: vehicle.type_name.clone(),
            status: trip.status,
            departure_date: trip.departure_date,
            departure_time: trip.departure_time,
            arrival_date: trip.arrival_date,
            arrival_time: trip.arrival_time,
            stock: trip.stock,
            price: route.price,
            estimated_distance: route.distance.clone(),
            estimated_time: route.estimated_time.clone(),
            departure_station: origin.station_name.clone(),
            arrival_station: terminal.map(|s| s.station_name.clone()),
            route_id: route.id,
            path_id: origin.path_id,
            full_route: None,
        })
    }

    fn collect_infos<F>(&self, filter: F) -> Vec<TripInfo>
    where
        F: Fn(&Trip, &Route) -> bool,
    {
        let mut infos: Vec<TripInfo> = self
            .trips
            .values()
            .filter(|t| self.routes.get(&t.route_id).map(|r| filter(t, r)).unwrap_or(false))
            .filter_map(|t| self.trip_info(t))
            .collect();
        infos.sort_by(|a, b| (a.departure_time, a.trip_id).cmp(&(b.departure_time, b.trip_id)));
        infos
    }
}

fn materialize(id: i32, trip: &NewTrip) -> Trip {
    Trip {
        id,
        departure_date: trip.departure_date,
        departure_time: trip.departure_time,
        arrival_date: trip.arrival_date,
        arrival_time: trip.arrival_time,
        vehicle_id: trip.vehicle_id,
        route_id: trip.route_id,
        pickup_id: trip.pickup_id.clone(),
        driver_id: trip.driver_id,
        total: trip.total,
        stock: trip.stock,
        status: trip.status.code(),
        created_at: trip.created_at,
        created_by: trip.created_by,
    }
}

#[async_trait]
impl TripStore for InMemoryStore {
    async fn find_all(&self) -> AppResult<Vec<Trip>> {
        Ok(self.lock()?.trips.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Trip>> {
        Ok(self.lock()?.trips.get(&id).cloned())
    }

    async fn find_by_status_in(&self, statuses: &[TripStatus]) -> AppResult<Vec<Trip>> {
        let state = self.lock()?;
        let trips = &state.trips;
        Ok(statuses
            .iter()
            .flat_map(|status| trips.values().filter(move |t| t.status == status.code()))
            .cloned()
            .collect())
    }

    async fn find_by_driver(&self, driver_id: i32) -> AppResult<Vec<Trip>> {
        let state = self.lock()?;
        let mut trips: Vec<Trip> = state
            .trips
            .values()
            .filter(|t| t.driver_id == Some(driver_id))
            .cloned()
            .collect();
        trips.sort_by_key(|t| (t.departure_at(), t.id));
        Ok(trips)
    }

    async fn find_conflicting_trip_for_driver(
        &self,
        driver_id: i32,
        window: &ScheduleWindow,
        exclude_trip_id: Option<i32>,
    ) -> AppResult<Option<Trip>> {
        let state = self.lock()?;
        let mut candidates: Vec<&Trip> = state
            .trips
            .values()
            .filter(|t| t.driver_id == Some(driver_id))
            .filter(|t| !t.is_cancelled())
            .filter(|t| Some(t.id) != exclude_trip_id)
            .filter(|t| match (t.departure_at(), t.arrival_at()) {
                (Some(departure), Some(arrival)) => window.intersects(departure, arrival),
                _ => false,
            })
            .collect();
        candidates.sort_by_key(|t| (t.departure_at(), t.id));
        Ok(candidates.first().map(|t| (*t).clone()))
    }

    async fn find_vehicle(&self, vehicle_id: i32) -> AppResult<Option<Vehicle>> {
        Ok(self.lock()?.vehicles.get(&vehicle_id).cloned())
    }

    async fn insert(&self, trip: &NewTrip) -> AppResult<Trip> {
        let mut state = self.lock()?;
        state.next_trip_id += 1;
        let saved = materialize(state.next_trip_id, trip);
        state.trips.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn update(&self, id: i32, trip: &NewTrip) -> AppResult<Option<Trip>> {
        let mut state = self.lock()?;
        let Some(existing) = state.trips.get_mut(&id) else {
            return Ok(None);
        };
        let mut replaced = materialize(id, trip);
        replaced.stock = existing.stock + (trip.total - existing.total);
        replaced.status = existing.status;
        replaced.created_at = existing.created_at;
        replaced.created_by = existing.created_by;
        *existing = replaced.clone();
        Ok(Some(replaced))
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        Ok(self.lock()?.trips.remove(&id).is_some())
    }

    async fn apply_stock_delta(&self, trip_id: i32, delta: i32, dedup_key: &str) -> AppResult<StockUpdate> {
        let mut state = self.lock()?;
        if state.processed.contains_key(dedup_key) {
            return Ok(StockUpdate::Duplicate);
        }
        let Some(trip) = state.trips.get_mut(&trip_id) else {
            return Ok(StockUpdate::TripNotFound);
        };
        trip.stock += delta;
        let update = StockUpdate::Applied {
            stock: trip.stock,
            total: trip.total,
        };
        state.processed.insert(dedup_key.to_string(), Utc::now());
        Ok(update)
    }

    async fn prune_processed_seat_events(&self, applied_before: DateTime<Utc>) -> AppResult<u64> {
        let mut state = self.lock()?;
        let before = state.processed.len();
        state.processed.retain(|_, applied_at| *applied_at >= applied_before);
        Ok((before - state.processed.len()) as u64)
    }

    async fn update_status_logged(&self, trip_id: i32, status: TripStatus, log: &NewTripLog) -> AppResult<()> {
        let mut state = self.lock()?;
        match state.trips.get_mut(&trip_id) {
            Some(trip) => trip.status = status.code(),
            None => return Err(AppError::NotFound(format!("Trip with id {} not found", trip_id))),
        }
        state.push_log(log);
        Ok(())
    }

    async fn append_log(&self, log: &NewTripLog) -> AppResult<()> {
        self.lock()?.push_log(log);
        Ok(())
    }

    async fn find_logs(&self, trip_id: i32) -> AppResult<Vec<TripLogEntry>> {
        Ok(self.logs_for(trip_id))
    }

    async fn search_trip_infos(&self, query: &TripSearchQuery) -> AppResult<Vec<TripInfo>> {
        let state = self.lock()?;
        Ok(state.collect_infos(|trip, route| {
            route.start_province_id == query.from_province_id
                && route.end_province_id == query.to_province_id
                && trip.departure_date == Some(query.departure_date)
                && trip.stock >= query.min_seats
                && trip.status == TripStatus::NotDeparted.code()
        }))
    }

    async fn find_trip_info(&self, trip_id: i32) -> AppResult<Option<TripInfo>> {
        let state = self.lock()?;
        Ok(state.trips.get(&trip_id).and_then(|t| state.trip_info(t)))
    }

    async fn find_route_trip_infos(&self, route_id: i32, departure_date: NaiveDate, min_seats: i32) -> AppResult<Vec<TripInfo>> {
        let state = self.lock()?;
        Ok(state.collect_infos(|trip, route| {
            route.id == route_id && trip.departure_date == Some(departure_date) && trip.stock >= min_seats
        }))
    }
}

#[async_trait]
impl StopStore for InMemoryStore {
    async fn find_route(&self, route_id: i32) -> AppResult<Option<Route>> {
        Ok(self.lock()?.routes.get(&route_id).cloned())
    }

    async fn find_by_route(&self, route_id: i32) -> AppResult<Vec<Stop>> {
        let state = self.lock()?;
        let mut stops: Vec<Stop> = state.stops.iter().filter(|s| s.route_id == route_id).cloned().collect();
        stops.sort_by(|a, b| (a.path_id, &a.id).cmp(&(b.path_id, &b.id)));
        Ok(stops)
    }

    async fn find_by_route_and_path(&self, route_id: i32, path_id: i32) -> AppResult<Vec<Stop>> {
        let state = self.lock()?;
        Ok(state
            .stops
            .iter()
            .filter(|s| s.route_id == route_id && s.path_id == path_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, stop: &NewStop) -> AppResult<Stop> {
        let mut state = self.lock()?;
        if state.stops.iter().any(|s| s.route_id == stop.route_id && s.id == stop.id) {
            return Err(AppError::BadRequest(format!("Stop {} already exists on route {}", stop.id, stop.route_id)));
        }
        let station_name = state
            .stations
            .get(&stop.station_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Station with id {} not found", stop.station_id)))?;
        let saved = Stop {
            id: stop.id.clone(),
            route_id: stop.route_id,
            self_id: stop.self_id.clone(),
            path_id: stop.path_id,
            station_id: stop.station_id,
            station_name,
            time: stop.time.clone(),
        };
        state.stops.push(saved.clone());
        Ok(saved)
    }
}
