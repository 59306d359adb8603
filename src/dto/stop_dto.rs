use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::route_path_resolver::PathStop;
use crate::utils::validation::validate_not_empty;

// Request para registrar una parada en una ruta
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStopRequest {
    #[validate(length(min = 1, max = 64), custom = "validate_not_empty")]
    pub id: String,
    /// "-1" origen, "-2" terminal, o el id de la parada anterior
    #[validate(length(min = 1, max = 64), custom = "validate_not_empty")]
    pub self_id: String,
    #[validate(range(min = 0))]
    pub path_id: i32,
    #[validate(range(min = 1))]
    pub station_id: i32,
    #[validate(length(max = 32))]
    pub time: Option<String>,
}

// Response de un camino de la ruta
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePathResponse {
    pub path_id: i32,
    pub full_route: Option<String>,
    pub stops: Vec<PathStop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
