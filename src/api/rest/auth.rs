//! Reads the caller identity forwarded by the authentication proxy.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;

pub const ROLE_HEADER: &str = "x-actor-role";
pub const ID_HEADER: &str = "x-actor-id";

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ID_HEADER)?
            .map(|raw| {
                Uuid::parse_str(raw.trim())
                    .map_err(|err| AppError::Unauthorized(format!("invalid {ID_HEADER}: {err}")))
            })
            .transpose()?;

        match header(parts, ROLE_HEADER)?.map(str::trim) {
            Some("admin") => Ok(Actor::Admin { user_id: id }),
            Some("installer") => {
                let installer_id = id.ok_or_else(|| {
                    AppError::Unauthorized(format!("{ID_HEADER} is required for installers"))
                })?;
                Ok(Actor::Installer { installer_id })
            }
            Some(other) => Err(AppError::Unauthorized(format!("unknown role: {other}"))),
            None => Err(AppError::Unauthorized(format!("{ROLE_HEADER} header is required"))),
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    parts
        .headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::Unauthorized(format!("{name} is not valid text")))
        })
        .transpose()
}
