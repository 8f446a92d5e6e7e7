use axum::{
    Router,
    routing::{get, post},
};

use super::{body, query};
use crate::{
    AppState,
    handlers::{self, accounts, properties},
    models::{LoginRequest, PropertyQuery, RegisterRequest},
};

/// Public Router
///
/// Endpoints open to anonymous clients: liveness, the sign-in flow and read-only
/// listing access. Inputs are still validated.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(handlers::health))
        // --- Sign-in flow ---
        .route(
            "/api/auth/register",
            body::<RegisterRequest>(post(accounts::register)),
        )
        .route("/api/auth/login", body::<LoginRequest>(post(accounts::login)))
        // Expiring a cookie needs no identity, so logout works even with a stale token.
        .route("/api/auth/logout", post(accounts::logout))
        // --- Browsing ---
        // GET /api/properties?city=...&min_price=...&page=...
        .route(
            "/api/properties",
            query::<PropertyQuery>(get(properties::list_properties)),
        )
        .route("/api/properties/{id}", get(properties::get_property))
        .route(
            "/api/properties/{id}/price-history",
            get(properties::price_history),
        )
}
