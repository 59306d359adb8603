//! Servicio de viajes
//!
//! CRUD de viajes con la verificación de agenda del conductor antes de cada
//! escritura, y las consultas de lectura para pasajeros (búsqueda, detalle,
//! viajes de una ruta) con el camino completo ya resuelto.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::dto::trip_dto::TripRequest;
use crate::messaging::{topics, EventPublisher};
use crate::models::events::{TripCreatedEvent, TripSearchEvent};
use crate::models::{NewTrip, NewTripLog, Trip, TripInfo, TripLogEntry, TripSearchQuery, TripStatus};
use crate::repositories::TripStore;
use crate::services::driver_conflict_detector::{DriverConflictDetector, DriverScheduleLocks, ScheduleCandidate};
use crate::services::route_path_catalog::RoutePathCatalog;
use crate::utils::errors::{bad_request_error, not_found_error, AppResult};
use crate::utils::validation::parse_date_field;

pub struct TripService {
    trips: Arc<dyn TripStore>,
    detector: DriverConflictDetector,
    driver_locks: DriverScheduleLocks,
    catalog: Arc<RoutePathCatalog>,
    publisher: EventPublisher,
}

impl TripService {
    pub fn new(trips: Arc<dyn TripStore>, catalog: Arc<RoutePathCatalog>, publisher: EventPublisher) -> Self {
        Self {
            detector: DriverConflictDetector::new(Arc::clone(&trips)),
            driver_locks: DriverScheduleLocks::new(),
            trips,
            catalog,
            publisher,
        }
    }

    pub async fn list_trips(&self) -> AppResult<Vec<Trip>> {
        self.trips.find_all().await
    }

    pub async fn get_trip(&self, id: i32) -> AppResult<Trip> {
        self.trips
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Trip", id))
    }

    pub async fn trips_by_driver(&self, driver_id: i32) -> AppResult<Vec<Trip>> {
        self.trips.find_by_driver(driver_id).await
    }

    pub async fn trip_logs(&self, trip_id: i32) -> AppResult<Vec<TripLogEntry>> {
        self.get_trip(trip_id).await?;
        self.trips.find_logs(trip_id).await
    }

    /// Crea un viaje en estado "no ha salido" y emite `trip_created`
    pub async fn create_trip(&self, actor_id: Option<i32>, request: TripRequest) -> AppResult<Trip> {
        request.validate()?;
        let mut new_trip = self.prepare(actor_id, &request, TripStatus::NotDeparted).await?;
        new_trip.stock = request.stock.unwrap_or(new_trip.total);
        if new_trip.stock > new_trip.total {
            return Err(bad_request_error("Available seats cannot exceed the total seats"));
        }

        let saved = match request.driver_id {
            Some(driver_id) => {
                let _guard = self.driver_locks.acquire(driver_id).await?;
                self.detector.check(&candidate(driver_id, &new_trip, None)).await?;
                self.trips.insert(&new_trip).await?
            }
            None => self.trips.insert(&new_trip).await?,
        };

        info!(
            "🚌 Viaje {} creado en la ruta {} ({} asientos)",
            saved.id, saved.route_id, saved.total
        );

        let event = TripCreatedEvent {
            trip_id: saved.id.to_string(),
            total_seats: saved.total,
            creation_timestamp: saved.created_at,
        };
        self.publisher
            .emit(topics::TRIP_CREATED, Some(saved.id.to_string()), &event);

        Ok(saved)
    }

    /// Reemplaza los datos editables. El estado solo cambia por el motor de
    /// estados y el stock solo por la conciliación de asientos: un cambio de
    /// `total` se traslada al stock en el mismo UPDATE.
    pub async fn update_trip(&self, actor_id: Option<i32>, id: i32, request: TripRequest) -> AppResult<Trip> {
        request.validate()?;
        if let Some(stock) = request.stock {
            debug!("⏭️ Viaje {}: stock {} ignorado en la actualización", id, stock);
        }
        let existing = self.get_trip(id).await?;
        let status = TripStatus::try_from(existing.status).unwrap_or(TripStatus::NotDeparted);
        let changes = self.prepare(actor_id, &request, status).await?;

        let updated = match request.driver_id {
            Some(driver_id) => {
                let _guard = self.driver_locks.acquire(driver_id).await?;
                self.detector.check(&candidate(driver_id, &changes, Some(id))).await?;
                self.trips.update(id, &changes).await?
            }
            None => self.trips.update(id, &changes).await?,
        }
        .ok_or_else(|| not_found_error("Trip", id))?;

        if updated.stock < 0 || updated.stock > updated.total {
            warn!(
                "⚠️ Viaje {}: stock fuera de rango tras cambiar el total ({}/{})",
                id, updated.stock, updated.total
            );
        }
        if actor_id.is_some() {
            self.trips.append_log(&NewTripLog::now(id, actor_id)).await?;
        }
        info!("✏️ Viaje {} actualizado", id);
        Ok(updated)
    }

    pub async fn delete_trip(&self, actor_id: Option<i32>, id: i32) -> AppResult<()> {
        if !self.trips.delete(id).await? {
            return Err(not_found_error("Trip", id));
        }
        if actor_id.is_some() {
            self.trips.append_log(&NewTripLog::now(id, actor_id)).await?;
        }
        info!("🗑️ Viaje {} eliminado", id);
        Ok(())
    }

    /// Búsqueda para pasajeros: solo viajes que aún no salieron
    pub async fn search(
        &self,
        from_province_id: i32,
        to_province_id: i32,
        departure_date: &str,
        min_seats: Option<i32>,
        user_id: Option<i32>,
    ) -> AppResult<Vec<TripInfo>> {
        let query = TripSearchQuery {
            from_province_id,
            to_province_id,
            departure_date: parse_date_field("date", departure_date)?,
            min_seats: seats_wanted(min_seats)?,
        };

        let event = TripSearchEvent {
            from_province_id,
            to_province_id,
            departure_date: query.departure_date,
            search_timestamp: Utc::now(),
            quantity: query.min_seats,
            user_id,
        };
        self.publisher.emit(topics::TRIP_SEARCH, None, &event);

        let infos = self.trips.search_trip_infos(&query).await?;
        info!(
            "🔎 Búsqueda {} → {} el {}: {} viajes",
            from_province_id,
            to_province_id,
            query.departure_date,
            infos.len()
        );
        self.with_full_routes(infos).await
    }

    pub async fn trip_info(&self, trip_id: i32) -> AppResult<TripInfo> {
        let info = self
            .trips
            .find_trip_info(trip_id)
            .await?
            .ok_or_else(|| not_found_error("Trip", trip_id))?;
        let mut infos = self.with_full_routes(vec![info]).await?;
        infos.pop().ok_or_else(|| not_found_error("Trip", trip_id))
    }

    pub async fn route_trips(&self, route_id: i32, departure_date: &str, min_seats: Option<i32>) -> AppResult<Vec<TripInfo>> {
        let date: NaiveDate = parse_date_field("date", departure_date)?;
        let infos = self
            .trips
            .find_route_trip_infos(route_id, date, seats_wanted(min_seats)?)
            .await?;
        self.with_full_routes(infos).await
    }

    async fn with_full_routes(&self, mut infos: Vec<TripInfo>) -> AppResult<Vec<TripInfo>> {
        for info in infos.iter_mut() {
            info.full_route = self.catalog.display(info.route_id, info.path_id).await?;
        }
        Ok(infos)
    }

    /// Completa el total por defecto y valida la coherencia del horario.
    /// El stock sale igual al total; solo la creación lo ajusta.
    async fn prepare(&self, actor_id: Option<i32>, request: &TripRequest, status: TripStatus) -> AppResult<NewTrip> {
        let total = match request.total {
            Some(total) => total,
            None => {
                self.trips
                    .find_vehicle(request.vehicle_id)
                    .await?
                    .ok_or_else(|| not_found_error("Vehicle", request.vehicle_id))?
                    .seat_number
            }
        };

        let new_trip = NewTrip {
            departure_date: request.departure_date,
            departure_time: request.departure_time,
            arrival_date: request.arrival_date,
            arrival_time: request.arrival_time,
            vehicle_id: request.vehicle_id,
            route_id: request.route_id,
            pickup_id: request.pickup_id.trim().to_string(),
            driver_id: request.driver_id,
            total,
            stock: total,
            status,
            created_at: Utc::now(),
            created_by: actor_id,
        };

        if let (Some(departure), Some(arrival)) = (departure_at(&new_trip), arrival_at(&new_trip)) {
            if arrival <= departure {
                warn!("⚠️ Llegada {} no posterior a la salida {}", arrival, departure);
                return Err(bad_request_error("Arrival must be after departure"));
            }
        }
        Ok(new_trip)
    }
}

fn seats_wanted(min_seats: Option<i32>) -> AppResult<i32> {
    match min_seats {
        Some(n) if n < 0 => Err(bad_request_error("Quantity cannot be negative")),
        Some(n) => Ok(n),
        None => Ok(1),
    }
}

fn departure_at(trip: &NewTrip) -> Option<chrono::NaiveDateTime> {
    Some(trip.departure_date?.and_time(trip.departure_time?))
}

fn arrival_at(trip: &NewTrip) -> Option<chrono::NaiveDateTime> {
    Some(trip.arrival_date?.and_time(trip.arrival_time?))
}

fn candidate(driver_id: i32, trip: &NewTrip, trip_id: Option<i32>) -> ScheduleCandidate {
    ScheduleCandidate {
        driver_id,
        departure_date: trip.departure_date,
        departure_time: trip.departure_time,
        arrival_date: trip.arrival_date,
        arrival_time: trip.arrival_time,
        trip_id,
    }
}
