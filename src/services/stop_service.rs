//! Servicio de paradas
//!
//! Registro de paradas de una ruta y consulta de sus caminos resueltos. Cada
//! parada nueva retira del catálogo el camino al que pertenece.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::dto::stop_dto::{CreateStopRequest, RoutePathResponse};
use crate::models::{NewStop, Route, Stop};
use crate::repositories::StopStore;
use crate::services::route_path_catalog::RoutePathCatalog;
use crate::utils::errors::{not_found_error, AppResult};
use crate::utils::validation::parse_time_field;

pub struct StopService {
    stops: Arc<dyn StopStore>,
    catalog: Arc<RoutePathCatalog>,
}

impl StopService {
    pub fn new(stops: Arc<dyn StopStore>, catalog: Arc<RoutePathCatalog>) -> Self {
        Self { stops, catalog }
    }

    async fn route(&self, route_id: i32) -> AppResult<Route> {
        self.stops
            .find_route(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", route_id))
    }

    pub async fn list_stops(&self, route_id: i32) -> AppResult<Vec<Stop>> {
        self.route(route_id).await?;
        self.stops.find_by_route(route_id).await
    }

    pub async fn create_stop(&self, actor_id: Option<i32>, route_id: i32, request: CreateStopRequest) -> AppResult<Stop> {
        request.validate()?;
        self.route(route_id).await?;
        let time = request
            .time
            .as_deref()
            .map(|t| parse_time_field("time", t))
            .transpose()?
            .map(|t| t.format("%H:%M").to_string());

        let stop = NewStop {
            id: request.id.trim().to_string(),
            route_id,
            self_id: request.self_id.trim().to_string(),
            path_id: request.path_id,
            station_id: request.station_id,
            time,
            created_by: actor_id,
        };
        let saved = self.stops.insert(&stop).await?;
        self.catalog.invalidate(route_id, saved.path_id).await;

        info!(
            "📍 Parada {} registrada en la ruta {} (camino {})",
            saved.id, route_id, saved.path_id
        );
        Ok(saved)
    }

    /// Todos los caminos de la ruta; uno mal formado se informa sin ocultar a los demás
    pub async fn route_paths(&self, route_id: i32) -> AppResult<Vec<RoutePathResponse>> {
        self.route(route_id).await?;
        let paths = self.catalog.route_paths(route_id).await?;

        Ok(paths
            .into_iter()
            .map(|(path_id, result)| match result {
                Ok(path) => RoutePathResponse {
                    path_id,
                    full_route: Some(path.display()),
                    stops: path.stops.clone(),
                    error: None,
                },
                Err(e) => {
                    warn!("⚠️ Camino mal formado: {}", e);
                    RoutePathResponse {
                        path_id,
                        full_route: None,
                        stops: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            })
            .collect())
    }
}
