//! Modelo de Stop (parada de recogida / bajada)
//!
//! Las paradas de un camino forman una lista enlazada por `self_id`:
//! `"-1"` marca el origen, `"-2"` marca la parada terminal y cualquier otro
//! valor es el id de la parada inmediatamente anterior.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Marcador de la parada de origen de un camino
pub const ORIGIN_MARKER: &str = "-1";
/// Marcador de la parada terminal de un camino
pub const TERMINAL_MARKER: &str = "-2";

/// Stop principal - tabla pickup unida con station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub route_id: i32,
    pub self_id: String,
    pub path_id: i32,
    pub station_id: i32,
    pub station_name: String,
    pub time: Option<String>,
}

/// Enlace de una parada dentro de su camino
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLink<'a> {
    Origin,
    Terminal,
    After(&'a str),
}

impl Stop {
    pub fn link(&self) -> StopLink<'_> {
        match self.self_id.trim() {
            ORIGIN_MARKER => StopLink::Origin,
            TERMINAL_MARKER => StopLink::Terminal,
            upstream => StopLink::After(upstream),
        }
    }

    pub fn is_origin(&self) -> bool {
        self.link() == StopLink::Origin
    }
}

/// Clave normalizada para comparar ids de paradas sin distinguir mayúsculas
pub fn stop_key(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Datos para registrar una nueva parada
#[derive(Debug, Clone)]
pub struct NewStop {
    pub id: String,
    pub route_id: i32,
    pub self_id: String,
    pub path_id: i32,
    pub station_id: i32,
    pub time: Option<String>,
    pub created_by: Option<i32>,
}
