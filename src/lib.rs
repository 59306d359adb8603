//! Servicio de viajes
//!
//! Núcleo del servicio de viajes de autobús: resolución de caminos de una
//! ruta, conciliación de asientos a partir de eventos de reservas, agenda de
//! conductores y motor de estados con difusión en tiempo real.

pub mod config;
pub mod database;
pub mod dto;
pub mod listeners;
pub mod messaging;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
