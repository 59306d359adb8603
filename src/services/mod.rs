//! Services module
//! 
//! Este módulo contiene la lógica de negocio del servicio de viajes:
//! resolución de caminos, conciliación de asientos, agenda de conductores
//! y el motor de estados. Los servicios dependen de los traits de
//! repositorio y del bus de eventos, nunca de implementaciones concretas.

pub mod driver_conflict_detector;
pub mod route_path_catalog;
pub mod route_path_resolver;
pub mod seat_inventory_reconciler;
pub mod stop_service;
pub mod trip_service;
pub mod trip_status_engine;

pub use driver_conflict_detector::DriverConflictDetector;
pub use route_path_catalog::RoutePathCatalog;
pub use seat_inventory_reconciler::SeatInventoryReconciler;
pub use stop_service::StopService;
pub use trip_service::TripService;
pub use trip_status_engine::{TransitionPolicy, TripStatusEngine};
