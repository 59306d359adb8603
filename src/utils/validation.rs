//! Utilidades de validación
//! 
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos.

use chrono::{NaiveDate, NaiveTime};
use validator::{ValidationError, ValidationErrors};

use crate::utils::errors::{AppError, AppResult};

/// Validar y convertir string a fecha
pub fn validate_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        let mut error = ValidationError::new("date");
        error.add_param("value".into(), &value.to_string());
        error.add_param("format".into(), &"YYYY-MM-DD".to_string());
        error
    })
}

/// Validar y convertir string a tiempo (HH:MM:SS o HH:MM)
pub fn validate_time(value: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M"))
        .map_err(|_| {
            let mut error = ValidationError::new("time");
            error.add_param("value".into(), &value.to_string());
            error.add_param("format".into(), &"HH:MM:SS".to_string());
            error
        })
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Fecha ISO de un campo de entrada; el error queda asociado al campo
pub fn parse_date_field(field: &'static str, value: &str) -> AppResult<NaiveDate> {
    validate_date(value).map_err(|error| {
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        AppError::Validation(errors)
    })
}

/// Hora de un campo de entrada; el error queda asociado al campo
pub fn parse_time_field(field: &'static str, value: &str) -> AppResult<NaiveTime> {
    validate_time(value).map_err(|error| {
        let mut errors = ValidationErrors::new();
        errors.add(field, error);
        AppError::Validation(errors)
    })
}
