use axum::{
    Router,
    routing::{delete, get, put},
};

use super::{body, restricted};
use crate::{AppState, auth::ADMIN_ONLY, handlers::admin, models::UpdateRoleRequest};

/// Admin Router
///
/// Account moderation and dashboard counters. Nested under `/api/admin`; every route
/// carries the authentication and admin-only authorization gates.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/users", restricted(get(admin::list_users), ADMIN_ONLY, state))
        // PUT /api/admin/users/{id}/role
        // The only path to the admin role; self-registration stops at agent.
        .route(
            "/users/{id}/role",
            body::<UpdateRoleRequest>(restricted(
                put(admin::update_user_role),
                ADMIN_ONLY,
                state,
            )),
        )
        .route(
            "/users/{id}",
            restricted(delete(admin::delete_user), ADMIN_ONLY, state),
        )
        .route("/stats", restricted(get(admin::get_stats), ADMIN_ONLY, state))
}
