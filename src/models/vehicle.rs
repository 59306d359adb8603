//! Modelo de Vehicle (tabla vehicle unida con su tipo)

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i32,
    pub license: String,
    pub seat_number: i32,
    pub type_name: String,
}
