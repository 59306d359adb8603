//! Modelos del sistema
//!
//! Este módulo contiene los modelos de datos que mapean al schema PostgreSQL
//! del servicio de viajes y los payloads de eventos del broker.

pub mod events;
pub mod route;
pub mod schedule;
pub mod stop;
pub mod trip;
pub mod trip_log;
pub mod vehicle;

pub use route::Route;
pub use schedule::ScheduleWindow;
pub use stop::{NewStop, Stop, StopLink};
pub use trip::{NewTrip, StockUpdate, Trip, TripInfo, TripSearchQuery, TripStatus};
pub use trip_log::{NewTripLog, TripLogEntry};
pub use vehicle::Vehicle;
