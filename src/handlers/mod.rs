//! Route handlers.
//!
//! Handlers are thin: they receive already-validated input (`Validated<T>`) and, on
//! protected routes, the identity resolved by the authentication gate (`AuthUser`),
//! call the repository and shape the `Success` envelope. Every failure is returned as
//! an `ApiError` and rendered by the error normalizer.

pub mod accounts;
pub mod admin;
pub mod preferences;
pub mod properties;
pub mod saved;

use axum::{Json, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::{Identity, Role},
    error::{ApiError, ApiResult, AppError},
    models::{Success, UserRow},
};

/// JSON body of every successful response.
pub type Reply<T> = Json<Success<T>>;

pub(crate) fn reply<T>(data: T) -> Reply<T> {
    Json(Success::new(data))
}

pub(crate) fn reply_with<T>(data: T, message: &str) -> Reply<T> {
    Json(Success::with_message(data, message))
}

/// The identity a stored account signs in as. A role the enum doesn't know is a data
/// problem, not a client error.
pub(crate) fn identity_of(user: &UserRow) -> ApiResult<Identity> {
    let role = user.role.parse::<Role>().map_err(ApiError::unexpected)?;
    Ok(Identity { id: user.id, role })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    pub service: String,
    pub version: String,
}

/// health
///
/// Liveness check. Does not touch the database.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service is up", body = Health))
)]
pub async fn health() -> Reply<Health> {
    reply_with(
        Health {
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        "Server is running",
    )
}

/// Fallback for unmatched paths; rendered through the normalizer like any other error.
pub async fn route_not_found() -> ApiError {
    AppError::not_found("Route not found").into()
}

/// Fallback for a known path called with a method it doesn't serve.
pub async fn method_not_allowed() -> ApiError {
    AppError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into()
}
