//! Motor de estados de viaje
//!
//! Valida y aplica cambios de estado, guarda el registro de auditoría en la
//! misma transacción y emite `trip_status_updated` sin esperar al broker.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::messaging::{topics, EventPublisher};
use crate::models::events::TripStatusUpdateEvent;
use crate::models::{NewTripLog, Trip, TripStatus};
use crate::repositories::TripStore;
use crate::utils::errors::{AppError, AppResult};

/// Política de transiciones permitidas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Cualquier estado puede pasar a cualquier otro
    #[default]
    Permissive,
    /// 0 → {1, 3}, 1 → {2, 3}; 2 y 3 son finales
    Strict,
}

impl TransitionPolicy {
    pub fn from_flag(strict: bool) -> Self {
        if strict {
            TransitionPolicy::Strict
        } else {
            TransitionPolicy::Permissive
        }
    }

    pub fn allows(self, from: TripStatus, to: TripStatus) -> bool {
        match self {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Strict => matches!(
                (from, to),
                (TripStatus::NotDeparted, TripStatus::Departed)
                    | (TripStatus::NotDeparted, TripStatus::Cancelled)
                    | (TripStatus::Departed, TripStatus::Arrived)
                    | (TripStatus::Departed, TripStatus::Cancelled)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdateOutcome {
    Updated { old: i32, new: TripStatus },
    /// El viaje ya estaba en ese estado; no se audita ni se emite nada
    Unchanged,
    NotFound,
}

pub struct TripStatusEngine {
    trips: Arc<dyn TripStore>,
    publisher: EventPublisher,
    policy: TransitionPolicy,
}

impl TripStatusEngine {
    pub fn new(trips: Arc<dyn TripStore>, publisher: EventPublisher, policy: TransitionPolicy) -> Self {
        Self {
            trips,
            publisher,
            policy,
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    pub async fn update_status(&self, actor_id: Option<i32>, trip_id: i32, new_status: i32) -> AppResult<StatusUpdateOutcome> {
        let new_status = TripStatus::try_from(new_status)?;

        let Some(trip) = self.trips.find_by_id(trip_id).await? else {
            warn!("⚠️ Viaje {} no encontrado al actualizar estado", trip_id);
            return Ok(StatusUpdateOutcome::NotFound);
        };

        // Un estado fuera de rango en la fila no bloquea el cambio en modo permisivo
        let current = TripStatus::try_from(trip.status).ok();
        if current == Some(new_status) {
            debug!("⏭️ Viaje {} ya está en estado {}", trip_id, new_status);
            return Ok(StatusUpdateOutcome::Unchanged);
        }

        if self.policy == TransitionPolicy::Strict {
            match current {
                Some(from) if self.policy.allows(from, new_status) => {}
                _ => {
                    return Err(AppError::InvalidTransition {
                        from: trip.status,
                        to: new_status.code(),
                    })
                }
            }
        }

        let log = NewTripLog {
            trip_id,
            updated_at: Utc::now(),
            updated_by: actor_id,
        };
        self.trips.update_status_logged(trip_id, new_status, &log).await?;

        info!(
            "🚦 Viaje {}: estado {} → {} (actor: {:?})",
            trip_id, trip.status, new_status.code(), actor_id
        );

        let event = TripStatusUpdateEvent {
            trip_id,
            old_status: Some(trip.status),
            new_status: new_status.code(),
            updated_by: actor_id,
            updated_at: log.updated_at,
        };
        self.publisher
            .emit(topics::TRIP_STATUS_UPDATED, Some(trip_id.to_string()), &event);

        Ok(StatusUpdateOutcome::Updated {
            old: trip.status,
            new: new_status,
        })
    }

    pub async fn trips_by_status(&self, status: i32) -> AppResult<Vec<Trip>> {
        let status = TripStatus::try_from(status)?;
        self.trips.find_by_status_in(&[status]).await
    }
}
