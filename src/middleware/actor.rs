//! Identidad del actor
//!
//! El gateway reenvía el id del usuario autenticado en `X-User-ID`. Se usa
//! para auditoría; su ausencia no bloquea la petición.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::utils::errors::{bad_request_error, AppError};

pub const ACTOR_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActorId(pub Option<i32>);

#[async_trait]
impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(ActorId(None));
        };
        raw.to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i32>().ok())
            .map(|id| ActorId(Some(id)))
            .ok_or_else(|| bad_request_error("X-User-ID header must be an integer user id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<ActorId, AppError> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header("X-User-ID", value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        ActorId::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_actor_header_is_optional() {
        assert_eq!(extract(None).await.unwrap(), ActorId(None));
        assert_eq!(extract(Some(" 42 ")).await.unwrap(), ActorId(Some(42)));
    }

    #[tokio::test]
    async fn test_non_numeric_actor_is_rejected() {
        assert!(matches!(extract(Some("admin")).await, Err(AppError::BadRequest(_))));
    }
}
