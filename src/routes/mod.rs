//! Router modules, split by who may call them.
//!
//! Every gate is attached per method router with `route_layer`. The layer added last
//! runs first, so the helpers below are always applied in the order
//! `signed_in`/`restricted` then `body`/`query`: validation runs before
//! authentication, and authorization runs right after authentication.

use axum::{
    extract::Request,
    middleware::{self, Next},
    routing::MethodRouter,
};

use crate::{
    AppState,
    auth::{Role, authenticate, authorize},
    validation::{Schema, validate_body, validate_query},
};

/// Anonymous access; handlers are reachable by anyone.
pub mod public;

/// Any signed-in user. Listing management adds a role check per route.
pub mod authenticated;

/// Admin-only surface, nested under `/api/admin`.
pub mod admin;

/// Authentication gate.
pub(crate) fn signed_in(route: MethodRouter<AppState>, state: &AppState) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn_with_state(state.clone(), authenticate))
}

/// Authentication gate followed by the authorization gate for `roles`.
pub(crate) fn restricted(
    route: MethodRouter<AppState>,
    roles: &'static [Role],
    state: &AppState,
) -> MethodRouter<AppState> {
    let route = route.route_layer(middleware::from_fn(
        move |request: Request, next: Next| authorize(roles, request, next),
    ));
    signed_in(route, state)
}

/// Validation gate for a JSON body.
pub(crate) fn body<T: Schema>(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn(validate_body::<T>))
}

/// Validation gate for the query string.
pub(crate) fn query<T: Schema>(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(middleware::from_fn(validate_query::<T>))
}
