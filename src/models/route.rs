//! Modelo de Route
//!
//! Una ruta une una provincia de inicio con una de fin; sus caminos
//! alternativos se describen con paradas (ver `stop`).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: i32,
    pub start_province_id: i32,
    pub end_province_id: i32,
    pub distance: String,
    pub estimated_time: String,
    pub price: i32,
    pub status: i32,
}
