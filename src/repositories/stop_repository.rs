use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use super::StopStore;
use crate::models::{NewStop, Route, Stop};
use crate::utils::errors::{AppError, AppResult};

const STOP_SELECT: &str = r#"
    SELECT p.id, p.route_id, p.self_id, p.path_id, p.station_id, st.name AS station_name, p.time
    FROM pickup p
    JOIN station st ON st.id = p.station_id
"#;

pub struct StopRepository {
    pool: PgPool,
}

impl StopRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StopStore for StopRepository {
    async fn find_route(&self, route_id: i32) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            SELECT id, start_province_id, end_province_id, distance, estimated_time, price, status
            FROM route WHERE id = $1
            "#,
        )
        .bind(route_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(route)
    }

    async fn find_by_route(&self, route_id: i32) -> AppResult<Vec<Stop>> {
        let stops = sqlx::query_as::<_, Stop>(&format!(
            "{STOP_SELECT} WHERE p.route_id = $1 ORDER BY p.path_id, p.id"
        ))
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stops)
    }

    async fn find_by_route_and_path(&self, route_id: i32, path_id: i32) -> AppResult<Vec<Stop>> {
        let stops = sqlx::query_as::<_, Stop>(&format!(
            "{STOP_SELECT} WHERE p.route_id = $1 AND p.path_id = $2 ORDER BY p.id"
        ))
        .bind(route_id)
        .bind(path_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stops)
    }

    async fn insert(&self, stop: &NewStop) -> AppResult<Stop> {
        let saved = sqlx::query_as::<_, Stop>(
            r#"
            WITH inserted AS (
                INSERT INTO pickup (id, route_id, self_id, path_id, station_id, time, created_at, created_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id, route_id, self_id, path_id, station_id, time
            )
            SELECT i.id, i.route_id, i.self_id, i.path_id, i.station_id, st.name AS station_name, i.time
            FROM inserted i
            JOIN station st ON st.id = i.station_id
            "#,
        )
        .bind(&stop.id)
        .bind(stop.route_id)
        .bind(&stop.self_id)
        .bind(stop.path_id)
        .bind(stop.station_id)
        .bind(&stop.time)
        .bind(Utc::now())
        .bind(stop.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::BadRequest(format!(
                        "Stop {} already exists on route {}",
                        stop.id, stop.route_id
                    ));
                }
                if db.is_foreign_key_violation() {
                    return AppError::NotFound(format!("Station with id {} not found", stop.station_id));
                }
            }
            AppError::Database(e)
        })?;
        Ok(saved)
    }
}
