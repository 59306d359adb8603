//! Sistema de manejo de errores
//!
//! Este módulo define todos los tipos de errores del servicio de viajes
//! y su conversión a respuestas HTTP apropiadas.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::messaging::BusError;
use crate::services::route_path_resolver::PathError;

/// Errores principales de la aplicación
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid trip status {0}: only values 0 to 3 are accepted")]
    InvalidStatus(i32),

    #[error("Departure/Arrival date and time are required for driver schedule check")]
    IncompleteSchedule,

    #[error("Driver has a conflicting trip schedule. Ensure at least a 1-hour break between trips. Conflicting trip ID: {conflicting_trip_id}")]
    DriverScheduleConflict { conflicting_trip_id: i32 },

    #[error("Trip status cannot move from {from} to {to}")]
    InvalidTransition { from: i32, to: i32 },

    #[error("Malformed route path: {0}")]
    MalformedPath(#[from] PathError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Message broker error: {0}")]
    Broker(#[from] BusError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errores de E/S que merecen reintento (base de datos o broker caídos)
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Database(e) => !matches!(e, sqlx::Error::RowNotFound | sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_)),
            AppError::Broker(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Respuesta de error para la API
#[derive(Debug, serde::Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    code: &'static str,
}

impl ErrorResponse {
    fn new(error: &str, message: String, code: &'static str) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            message,
            details: None,
            code,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            AppError::Database(e) => {
                tracing::error!("❌ Error de base de datos: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "Database Error",
                        "An error occurred while accessing the database".to_string(),
                        "DB_ERROR",
                    ),
                )
            }

            AppError::Validation(e) => {
                tracing::warn!("⚠️ Error de validación: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Validation Error", "The provided data is invalid".to_string(), "VALIDATION_ERROR")
                        .with_details(json!(e)),
                )
            }

            AppError::InvalidStatus(status) => {
                tracing::warn!("⚠️ Estado de viaje inválido: {}", status);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Validation Error", message, "INVALID_STATUS")
                        .with_details(json!({ "status": status })),
                )
            }

            AppError::IncompleteSchedule => {
                tracing::warn!("⚠️ Horario incompleto para verificación de conductor");
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::new("Validation Error", message, "INCOMPLETE_SCHEDULE"),
                )
            }

            AppError::DriverScheduleConflict { conflicting_trip_id } => {
                tracing::warn!("🚫 Conflicto de horario con el viaje {}", conflicting_trip_id);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("Conflict", message, "DRIVER_SCHEDULE_CONFLICT")
                        .with_details(json!({ "conflictingTripId": conflicting_trip_id })),
                )
            }

            AppError::InvalidTransition { from, to } => {
                tracing::warn!("🚫 Transición de estado rechazada: {} -> {}", from, to);
                (
                    StatusCode::CONFLICT,
                    ErrorResponse::new("Conflict", message, "INVALID_TRANSITION")
                        .with_details(json!({ "from": from, "to": to })),
                )
            }

            AppError::MalformedPath(e) => {
                tracing::error!("❌ Ruta mal formada: {}", e);
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorResponse::new("Malformed Path", message, "MALFORMED_PATH"),
                )
            }

            AppError::NotFound(msg) => {
                tracing::warn!("🔍 Recurso no encontrado: {}", msg);
                (StatusCode::NOT_FOUND, ErrorResponse::new("Not Found", msg, "NOT_FOUND"))
            }

            AppError::BadRequest(msg) => {
                tracing::warn!("⚠️ Solicitud incorrecta: {}", msg);
                (StatusCode::BAD_REQUEST, ErrorResponse::new("Bad Request", msg, "BAD_REQUEST"))
            }

            AppError::Broker(e) => {
                tracing::error!("❌ Error del broker de mensajes: {}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(
                        "Service Unavailable",
                        "The message broker is unavailable".to_string(),
                        "BROKER_ERROR",
                    ),
                )
            }

            AppError::Serialization(e) => {
                tracing::error!("❌ Error de serialización: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal Server Error", "An unexpected error occurred".to_string(), "SERIALIZATION_ERROR"),
                )
            }

            AppError::Internal(msg) => {
                tracing::error!("❌ Error interno: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Internal Server Error", "An unexpected error occurred".to_string(), "INTERNAL_ERROR")
                        .with_details(json!({ "internal_error": msg })),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Resultado tipado para operaciones que pueden fallar
pub type AppResult<T> = Result<T, AppError>;

/// Función helper para crear errores de recurso no encontrado
pub fn not_found_error(resource: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{} with id '{}' not found", resource, id))
}

/// Función helper para crear errores de solicitud incorrecta
pub fn bad_request_error(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_409() {
        let response = AppError::DriverScheduleConflict { conflicting_trip_id: 7 }.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_validation_errors_map_to_400() {
        assert_eq!(AppError::InvalidStatus(9).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::IncompleteSchedule.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transient_classification() {
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!AppError::NotFound("trip".into()).is_transient());
        assert!(!AppError::InvalidStatus(4).is_transient());
    }

    #[test]
    fn test_conflict_message_names_trip() {
        let err = AppError::DriverScheduleConflict { conflicting_trip_id: 42 };
        assert!(err.to_string().contains("42"));
    }
}
