use axum::extract::State;
use uuid::Uuid;

use super::{Reply, reply, reply_with};
use crate::{
    AppState,
    auth::{AuthUser, Role},
    error::{ApiResult, AppError},
    models::{AdminStats, UpdateRoleRequest, UserProfile},
    validation::{PathParam, Validated},
};

// Every handler here sits behind the admin-only authorization gate.

#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    responses(
        (status = 200, description = "All accounts, newest first", body = [UserProfile]),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Reply<Vec<UserProfile>>> {
    let users = state.repo.list_users().await?;
    Ok(reply(users.into_iter().map(UserProfile::from).collect()))
}

/// update_user_role
///
/// [Admin Route] The only way an account becomes an admin.
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/role",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role changed", body = UserProfile),
        (status = 404, description = "User not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_user_role(
    admin: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    Validated(payload): Validated<UpdateRoleRequest>,
) -> ApiResult<Reply<UserProfile>> {
    let role = payload.role.parse::<Role>()?;

    let user = state
        .repo
        .set_user_role(id, role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    tracing::info!(admin_id = %admin.id, user_id = %id, role = %role, "role changed");
    Ok(reply_with(user.into(), "User role updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account deleted"),
        (status = 404, description = "User not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_user(
    admin: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Reply<()>> {
    if !state.repo.delete_user(id).await? {
        return Err(AppError::not_found("User not found").into());
    }
    tracing::info!(admin_id = %admin.id, user_id = %id, "account removed by admin");
    Ok(reply_with((), "User deleted successfully"))
}

/// get_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "admin",
    responses((status = 200, description = "Platform counters", body = AdminStats))
)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Reply<AdminStats>> {
    Ok(reply(state.repo.get_stats().await?))
}
