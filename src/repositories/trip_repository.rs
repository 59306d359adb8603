use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use super::TripStore;
use crate::models::{
    NewTrip, NewTripLog, ScheduleWindow, StockUpdate, Trip, TripInfo, TripLogEntry, TripSearchQuery,
    TripStatus, Vehicle,
};
use crate::utils::errors::AppResult;

const TRIP_COLUMNS: &str = "id, departure_date, departure_time, arrival_date, arrival_time, vehicle_id, \
     route_id, pickup_id, driver_id, total, stock, status, created_at, created_by";

/// Proyección común de las consultas para pasajeros. El camino completo se
/// resuelve aparte a partir de `route_id` y `path_id`.
const TRIP_INFO_SELECT: &str = r#"
    SELECT
        t.id AS trip_id,
        CAST(t.vehicle_id AS TEXT) AS vehicle_id,
        v.license AS license,
        ty.name AS vehicle_type,
        t.status AS status,
        t.departure_date,
        t.departure_time,
        t.arrival_date,
        t.arrival_time,
        t.stock AS stock,
        r.price AS price,
        r.distance AS estimated_distance,
        r.estimated_time AS estimated_time,
        s_start.name AS departure_station,
        s_end.name AS arrival_station,
        r.id AS route_id,
        p_start.path_id AS path_id
    FROM trip t
    JOIN route r ON t.route_id = r.id
    JOIN pickup p_start ON p_start.route_id = r.id
        AND LOWER(TRIM(p_start.id)) = LOWER(TRIM(t.pickup_id))
        AND TRIM(p_start.self_id) = '-1'
    JOIN station s_start ON p_start.station_id = s_start.id
    LEFT JOIN pickup p_end ON p_end.route_id = r.id
        AND p_end.path_id = p_start.path_id
        AND TRIM(p_end.self_id) = '-2'
    LEFT JOIN station s_end ON p_end.station_id = s_end.id
    JOIN vehicle v ON t.vehicle_id = v.id
    JOIN vehicle_type ty ON v.type_id = ty.id
"#;

pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripStore for TripRepository {
    async fn find_all(&self) -> AppResult<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trip ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        Ok(trips)
    }

    async fn find_by_id(&self, id: i32) -> AppResult<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trip WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(trip)
    }

    async fn find_by_status_in(&self, statuses: &[TripStatus]) -> AppResult<Vec<Trip>> {
        let codes: Vec<i32> = statuses.iter().map(|s| s.code()).collect();
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trip WHERE status = ANY($1) \
             ORDER BY array_position($1, status), id"
        ))
        .bind(&codes)
        .fetch_all(&self.pool)
        .await?;
        Ok(trips)
    }

    async fn find_by_driver(&self, driver_id: i32) -> AppResult<Vec<Trip>> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trip WHERE driver_id = $1 ORDER BY departure_date, departure_time, id"
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(trips)
    }

    async fn find_conflicting_trip_for_driver(
        &self,
        driver_id: i32,
        window: &ScheduleWindow,
        exclude_trip_id: Option<i32>,
    ) -> AppResult<Option<Trip>> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            r#"
            SELECT {TRIP_COLUMNS} FROM trip
            WHERE driver_id = $1
              AND status <> $4
              AND ($5::INT IS NULL OR id <> $5)
              AND departure_date IS NOT NULL AND departure_time IS NOT NULL
              AND arrival_date IS NOT NULL AND arrival_time IS NOT NULL
              AND (departure_date + departure_time) < $3
              AND (arrival_date + arrival_time) > $2
            ORDER BY departure_date, departure_time, id
            LIMIT 1
            "#
        ))
        .bind(driver_id)
        .bind(window.start)
        .bind(window.end)
        .bind(TripStatus::Cancelled.code())
        .bind(exclude_trip_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(trip)
    }

    async fn find_vehicle(&self, vehicle_id: i32) -> AppResult<Option<Vehicle>> {
        let vehicle = sqlx::query_as::<_, Vehicle>(
            r#"
            SELECT v.id, v.license, v.seat_number, ty.name AS type_name
            FROM vehicle v
            JOIN vehicle_type ty ON v.type_id = ty.id
            WHERE v.id = $1
            "#,
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(vehicle)
    }

    async fn insert(&self, trip: &NewTrip) -> AppResult<Trip> {
        let saved = sqlx::query_as::<_, Trip>(&format!(
            r#"
            INSERT INTO trip (departure_date, departure_time, arrival_date, arrival_time, vehicle_id,
                              route_id, pickup_id, driver_id, total, stock, status, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {TRIP_COLUMNS}
            "#
        ))
        .bind(trip.departure_date)
        .bind(trip.departure_time)
        .bind(trip.arrival_date)
        .bind(trip.arrival_time)
        .bind(trip.vehicle_id)
        .bind(trip.route_id)
        .bind(&trip.pickup_id)
        .bind(trip.driver_id)
        .bind(trip.total)
        .bind(trip.stock)
        .bind(trip.status.code())
        .bind(trip.created_at)
        .bind(trip.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn update(&self, id: i32, trip: &NewTrip) -> AppResult<Option<Trip>> {
        let saved = sqlx::query_as::<_, Trip>(&format!(
            r#"
            UPDATE trip
            SET departure_date = $2, departure_time = $3, arrival_date = $4, arrival_time = $5,
                vehicle_id = $6, route_id = $7, pickup_id = $8, driver_id = $9,
                total = $10, stock = stock + ($10 - total)
            WHERE id = $1
            RETURNING {TRIP_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(trip.departure_date)
        .bind(trip.departure_time)
        .bind(trip.arrival_date)
        .bind(trip.arrival_time)
        .bind(trip.vehicle_id)
        .bind(trip.route_id)
        .bind(&trip.pickup_id)
        .bind(trip.driver_id)
        .bind(trip.total)
        .fetch_optional(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn delete(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM trip WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn apply_stock_delta(&self, trip_id: i32, delta: i32, dedup_key: &str) -> AppResult<StockUpdate> {
        let mut tx = self.pool.begin().await?;

        let recorded = sqlx::query(
            r#"
            INSERT INTO processed_seat_event (dedup_key, trip_id, delta, applied_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (dedup_key) DO NOTHING
            "#,
        )
        .bind(dedup_key)
        .bind(trip_id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if recorded == 0 {
            tx.rollback().await?;
            return Ok(StockUpdate::Duplicate);
        }

        let row: Option<(i32, i32)> =
            sqlx::query_as("UPDATE trip SET stock = stock + $2 WHERE id = $1 RETURNING stock, total")
                .bind(trip_id)
                .bind(delta)
                .fetch_optional(&mut *tx)
                .await?;

        match row {
            Some((stock, total)) => {
                tx.commit().await?;
                Ok(StockUpdate::Applied { stock, total })
            }
            None => {
                tx.rollback().await?;
                Ok(StockUpdate::TripNotFound)
            }
        }
    }

    async fn prune_processed_seat_events(&self, applied_before: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM processed_seat_event WHERE applied_at < $1")
            .bind(applied_before)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn update_status_logged(&self, trip_id: i32, status: TripStatus, log: &NewTripLog) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE trip SET status = $2 WHERE id = $1")
            .bind(trip_id)
            .bind(status.code())
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO trip_log (trip_id, updated_at, updated_by) VALUES ($1, $2, $3)")
            .bind(log.trip_id)
            .bind(log.updated_at)
            .bind(log.updated_by)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn append_log(&self, log: &NewTripLog) -> AppResult<()> {
        sqlx::query("INSERT INTO trip_log (trip_id, updated_at, updated_by) VALUES ($1, $2, $3)")
            .bind(log.trip_id)
            .bind(log.updated_at)
            .bind(log.updated_by)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_logs(&self, trip_id: i32) -> AppResult<Vec<TripLogEntry>> {
        let logs = sqlx::query_as::<_, TripLogEntry>(
            "SELECT id, trip_id, updated_at, updated_by FROM trip_log WHERE trip_id = $1 ORDER BY id",
        )
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn search_trip_infos(&self, query: &TripSearchQuery) -> AppResult<Vec<TripInfo>> {
        let infos = sqlx::query_as::<_, TripInfo>(&format!(
            r#"{TRIP_INFO_SELECT}
            WHERE r.start_province_id = $1
              AND r.end_province_id = $2
              AND t.departure_date = $3
              AND t.stock >= $4
              AND t.status = $5
            ORDER BY t.departure_time, t.id
            "#
        ))
        .bind(query.from_province_id)
        .bind(query.to_province_id)
        .bind(query.departure_date)
        .bind(query.min_seats)
        .bind(TripStatus::NotDeparted.code())
        .fetch_all(&self.pool)
        .await?;
        Ok(infos)
    }

    async fn find_trip_info(&self, trip_id: i32) -> AppResult<Option<TripInfo>> {
        let info = sqlx::query_as::<_, TripInfo>(&format!("{TRIP_INFO_SELECT} WHERE t.id = $1"))
            .bind(trip_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(info)
    }

    async fn find_route_trip_infos(&self, route_id: i32, departure_date: NaiveDate, min_seats: i32) -> AppResult<Vec<TripInfo>> {
        let infos = sqlx::query_as::<_, TripInfo>(&format!(
            r#"{TRIP_INFO_SELECT}
            WHERE r.id = $1
              AND t.departure_date = $2
              AND t.stock >= $3
            ORDER BY t.departure_time, t.id
            "#
        ))
        .bind(route_id)
        .bind(departure_date)
        .bind(min_seats)
        .fetch_all(&self.pool)
        .await?;
        Ok(infos)
    }
}
