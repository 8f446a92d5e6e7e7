use axum::extract::State;

use super::{Reply, reply, reply_with};
use crate::{
    AppState,
    auth::AuthUser,
    error::ApiResult,
    models::{NotificationPreferences, UpdatePreferencesRequest},
    validation::Validated,
};

/// get_preferences
///
/// [Authenticated Route] The caller's notification settings. The first read creates
/// the defaults.
#[utoipa::path(
    get,
    path = "/api/notification-preferences",
    tag = "preferences",
    responses((status = 200, description = "Preferences", body = NotificationPreferences))
)]
pub async fn get_preferences(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Reply<NotificationPreferences>> {
    Ok(reply(state.repo.get_or_create_preferences(user.id).await?))
}

#[utoipa::path(
    put,
    path = "/api/notification-preferences",
    tag = "preferences",
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Updated preferences", body = NotificationPreferences),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody)
    )
)]
pub async fn update_preferences(
    user: AuthUser,
    State(state): State<AppState>,
    Validated(payload): Validated<UpdatePreferencesRequest>,
) -> ApiResult<Reply<NotificationPreferences>> {
    let prefs = state.repo.update_preferences(user.id, payload).await?;
    Ok(reply_with(prefs, "Preferences updated successfully"))
}
