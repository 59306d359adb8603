mod common;

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};

use trip_service::config::EnvironmentConfig;
use trip_service::dto::trip_dto::TripRequest;
use trip_service::models::Trip;
use trip_service::utils::errors::AppError;

use common::{at, context, day};

fn request(driver_id: i32, from: (u32, u32), to: (u32, u32)) -> TripRequest {
    TripRequest {
        departure_date: Some(day()),
        departure_time: Some(at(from.0, from.1)),
        arrival_date: Some(day()),
        arrival_time: Some(at(to.0, to.1)),
        vehicle_id: 3,
        route_id: 1,
        pickup_id: "10".into(),
        driver_id: Some(driver_id),
        total: None,
        stock: None,
    }
}

fn span(trip: &Trip) -> (NaiveDateTime, NaiveDateTime) {
    (trip.departure_at().unwrap(), trip.arrival_at().unwrap())
}

/// Ningún par de viajes aceptados del mismo conductor queda a menos de una hora
fn assert_rest_respected(trips: &[Trip]) {
    for (i, a) in trips.iter().enumerate() {
        for b in trips.iter().skip(i + 1) {
            let (a_start, a_end) = span(a);
            let (b_start, b_end) = span(b);
            let buffer = Duration::hours(1);
            assert!(
                b_start >= a_end + buffer || a_start >= b_end + buffer,
                "trips {} and {} are less than one hour apart",
                a.id,
                b.id
            );
        }
    }
}

#[tokio::test]
async fn test_sequential_saves_never_accept_overlapping_trips() {
    let ctx = context(EnvironmentConfig::default());
    let service = &ctx.state.trips;

    // Horarios escalonados cada 45 minutos: unos chocan y otros no
    let mut accepted = Vec::new();
    for slot in 0..16u32 {
        let start = 6 * 60 + slot * 45;
        let end = start + 90;
        let result = service
            .create_trip(None, request(7, (start / 60, start % 60), (end / 60, end % 60)))
            .await;
        match result {
            Ok(trip) => accepted.push(trip),
            Err(AppError::DriverScheduleConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert!(accepted.len() >= 2);
    assert_rest_respected(&accepted);
}

#[tokio::test]
async fn test_concurrent_saves_for_one_driver_accept_only_one() {
    let ctx = context(EnvironmentConfig::default());
    let service = Arc::clone(&ctx.state.trips);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.create_trip(None, request(9, (10, 0), (12, 0))).await })
        })
        .collect();

    let mut accepted = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(AppError::DriverScheduleConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn test_updating_a_trip_checks_against_other_trips_only() {
    let ctx = context(EnvironmentConfig::default());
    let service = &ctx.state.trips;

    let a = service.create_trip(None, request(7, (10, 0), (12, 0))).await.unwrap();
    let b = service.create_trip(None, request(7, (14, 0), (16, 0))).await.unwrap();

    // Mover A media hora no choca consigo mismo
    assert!(service.update_trip(Some(1), a.id, request(7, (10, 30), (12, 30))).await.is_ok());

    // Acercar B a A sí choca
    let err = service
        .update_trip(Some(1), b.id, request(7, (13, 0), (15, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DriverScheduleConflict { conflicting_trip_id } if conflicting_trip_id == a.id));
    assert_eq!(ctx.store.logs_for(a.id).len(), 1);
}

#[tokio::test]
async fn test_stock_above_total_is_rejected() {
    let ctx = context(EnvironmentConfig::default());
    let mut req = request(7, (10, 0), (12, 0));
    req.total = Some(10);
    req.stock = Some(11);

    let err = ctx.state.trips.create_trip(None, req).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}
