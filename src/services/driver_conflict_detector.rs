//! Detección de conflictos de horario de conductores
//!
//! Antes de guardar un viaje con conductor se comprueba que el conductor no
//! tenga otro viaje no cancelado a menos de una hora de descanso.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate, NaiveTime};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, warn};

use crate::models::{ScheduleWindow, Trip};
use crate::repositories::TripStore;
use crate::utils::errors::{AppError, AppResult};

/// Descanso obligatorio entre dos viajes del mismo conductor
pub const REST_BUFFER_HOURS: i64 = 1;

/// Horario propuesto para un viaje
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleCandidate {
    pub driver_id: i32,
    pub departure_date: Option<NaiveDate>,
    pub departure_time: Option<NaiveTime>,
    pub arrival_date: Option<NaiveDate>,
    pub arrival_time: Option<NaiveTime>,
    /// Id propio cuando se actualiza un viaje existente
    pub trip_id: Option<i32>,
}

impl ScheduleCandidate {
    pub fn window(&self) -> AppResult<ScheduleWindow> {
        match (self.departure_date, self.departure_time, self.arrival_date, self.arrival_time) {
            (Some(dd), Some(dt), Some(ad), Some(at)) => Ok(ScheduleWindow::around(
                dd.and_time(dt),
                ad.and_time(at),
                Duration::hours(REST_BUFFER_HOURS),
            )),
            _ => Err(AppError::IncompleteSchedule),
        }
    }
}

pub struct DriverConflictDetector {
    trips: Arc<dyn TripStore>,
}

impl DriverConflictDetector {
    pub fn new(trips: Arc<dyn TripStore>) -> Self {
        Self { trips }
    }

    /// Primer viaje del conductor que choca con el candidato, si existe
    pub async fn find_conflict(&self, candidate: &ScheduleCandidate) -> AppResult<Option<Trip>> {
        let window = candidate.window()?;
        debug!(
            "🔍 Revisando agenda del conductor {} entre {} y {}",
            candidate.driver_id, window.start, window.end
        );
        self.trips
            .find_conflicting_trip_for_driver(candidate.driver_id, &window, candidate.trip_id)
            .await
    }

    /// Rechaza el guardado si hay conflicto
    pub async fn check(&self, candidate: &ScheduleCandidate) -> AppResult<()> {
        match self.find_conflict(candidate).await? {
            Some(conflicting) => {
                warn!(
                    "🚫 Conductor {} con conflicto de horario contra el viaje {}",
                    candidate.driver_id, conflicting.id
                );
                Err(AppError::DriverScheduleConflict {
                    conflicting_trip_id: conflicting.id,
                })
            }
            None => Ok(()),
        }
    }
}

/// Un candado asíncrono por conductor, retenido entre la revisión y la escritura
#[derive(Default)]
pub struct DriverScheduleLocks {
    locks: Mutex<HashMap<i32, Arc<tokio::sync::Mutex<()>>>>,
}

impl DriverScheduleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, driver_id: i32) -> AppResult<OwnedMutexGuard<()>> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| AppError::Internal("driver lock table poisoned".to_string()))?;
            Arc::clone(locks.entry(driver_id).or_default())
        };
        Ok(lock.lock_owned().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTrip, TripStatus};
    use crate::repositories::InMemoryStore;
    use chrono::Utc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn hm(hour: u32, minute: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    fn candidate(driver_id: i32, from: (u32, u32), to: (u32, u32)) -> ScheduleCandidate {
        ScheduleCandidate {
            driver_id,
            departure_date: Some(day()),
            departure_time: hm(from.0, from.1),
            arrival_date: Some(day()),
            arrival_time: hm(to.0, to.1),
            trip_id: None,
        }
    }

    async fn seed(store: &InMemoryStore, driver_id: i32, from: (u32, u32), to: (u32, u32), status: TripStatus) -> Trip {
        TripStore::insert(
            store,
            &NewTrip {
                departure_date: Some(day()),
                departure_time: hm(from.0, from.1),
                arrival_date: Some(day()),
                arrival_time: hm(to.0, to.1),
                vehicle_id: 1,
                route_id: 1,
                pickup_id: "10".into(),
                driver_id: Some(driver_id),
                total: 30,
                stock: 30,
                status,
                created_at: Utc::now(),
                created_by: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_half_hour_gap_conflicts_with_existing_trip() {
        let store = Arc::new(InMemoryStore::new());
        let a = seed(&store, 7, (10, 0), (12, 0), TripStatus::NotDeparted).await;
        let detector = DriverConflictDetector::new(store.clone());

        let err = detector.check(&candidate(7, (12, 30), (14, 0))).await.unwrap_err();
        assert!(matches!(err, AppError::DriverScheduleConflict { conflicting_trip_id } if conflicting_trip_id == a.id));
    }

    #[tokio::test]
    async fn test_exact_one_hour_rest_is_accepted() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, 7, (10, 0), (12, 0), TripStatus::NotDeparted).await;
        let detector = DriverConflictDetector::new(store.clone());

        assert!(detector.check(&candidate(7, (13, 0), (15, 0))).await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_and_other_driver_trips_are_ignored() {
        let store = Arc::new(InMemoryStore::new());
        seed(&store, 7, (10, 0), (12, 0), TripStatus::Cancelled).await;
        seed(&store, 8, (10, 0), (12, 0), TripStatus::NotDeparted).await;
        let detector = DriverConflictDetector::new(store.clone());

        assert!(detector.check(&candidate(7, (11, 0), (13, 0))).await.is_ok());
    }

    #[tokio::test]
    async fn test_own_trip_is_excluded_on_update() {
        let store = Arc::new(InMemoryStore::new());
        let own = seed(&store, 7, (10, 0), (12, 0), TripStatus::NotDeparted).await;
        let detector = DriverConflictDetector::new(store.clone());

        let mut moved = candidate(7, (10, 30), (12, 30));
        moved.trip_id = Some(own.id);
        assert!(detector.check(&moved).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_schedule_field_is_rejected() {
        let detector = DriverConflictDetector::new(Arc::new(InMemoryStore::new()));
        let mut incomplete = candidate(7, (10, 0), (12, 0));
        incomplete.arrival_time = None;

        let err = detector.check(&incomplete).await.unwrap_err();
        assert!(matches!(err, AppError::IncompleteSchedule));
    }

    #[tokio::test]
    async fn test_locks_are_per_driver() {
        let locks = DriverScheduleLocks::new();
        let held = locks.acquire(1).await.unwrap();

        // Otro conductor no espera
        let other = tokio::time::timeout(std::time::Duration::from_millis(50), locks.acquire(2)).await;
        assert!(other.is_ok());

        // El mismo conductor espera hasta que se suelte
        let same = tokio::time::timeout(std::time::Duration::from_millis(50), locks.acquire(1)).await;
        assert!(same.is_err());
        drop(held);
        assert!(locks.acquire(1).await.is_ok());
    }
}
