//! DTOs de la API HTTP
//!
//! Requests validados con `validator` y respuestas envueltas en `ApiResponse`.

pub mod api_response;
pub mod stop_dto;
pub mod trip_dto;

pub use api_response::ApiResponse;
