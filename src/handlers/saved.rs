use axum::{extract::State, http::StatusCode};
use uuid::Uuid;

use super::{Reply, reply, reply_with};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResult, AppError},
    models::{
        CreateSavedSearchRequest, SavePropertyRequest, SavedProperty, SavedSearch,
        UpdateSavedSearchRequest,
    },
    validation::{PathParam, Validated},
};

// --- Saved properties ---

#[utoipa::path(
    get,
    path = "/api/saved-properties",
    tag = "saved",
    responses((status = 200, description = "Bookmarked listings, newest first", body = [SavedProperty]))
)]
pub async fn list_saved_properties(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Reply<Vec<SavedProperty>>> {
    Ok(reply(state.repo.list_saved_properties(user.id).await?))
}

/// save_property
///
/// [Authenticated Route] Bookmarks a listing. Saving the same listing twice is a 400,
/// not a silent no-op.
#[utoipa::path(
    post,
    path = "/api/saved-properties",
    tag = "saved",
    request_body = SavePropertyRequest,
    responses(
        (status = 201, description = "Saved"),
        (status = 400, description = "Property already saved", body = crate::error::ErrorBody),
        (status = 404, description = "Property not found", body = crate::error::ErrorBody)
    )
)]
pub async fn save_property(
    user: AuthUser,
    State(state): State<AppState>,
    Validated(payload): Validated<SavePropertyRequest>,
) -> ApiResult<(StatusCode, Reply<()>)> {
    if state.repo.find_property(payload.property_id).await?.is_none() {
        return Err(AppError::not_found("Property not found").into());
    }

    let inserted = state
        .repo
        .save_property(user.id, payload.property_id, payload.notes)
        .await?;
    if !inserted {
        return Err(AppError::conflict("Property already saved").into());
    }

    Ok((
        StatusCode::CREATED,
        reply_with((), "Property saved successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/saved-properties/{property_id}",
    tag = "saved",
    params(("property_id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Removed from saved"),
        (status = 404, description = "Saved property not found", body = crate::error::ErrorBody)
    )
)]
pub async fn unsave_property(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(property_id): PathParam<Uuid>,
) -> ApiResult<Reply<()>> {
    if !state.repo.unsave_property(user.id, property_id).await? {
        return Err(AppError::not_found("Saved property not found").into());
    }
    Ok(reply_with((), "Property removed from saved"))
}

// --- Saved searches ---
// Every lookup is scoped to the caller, so someone else's search reads as missing.

#[utoipa::path(
    get,
    path = "/api/saved-searches",
    tag = "saved",
    responses((status = 200, description = "Saved searches", body = [SavedSearch]))
)]
pub async fn list_saved_searches(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Reply<Vec<SavedSearch>>> {
    Ok(reply(state.repo.list_saved_searches(user.id).await?))
}

#[utoipa::path(
    post,
    path = "/api/saved-searches",
    tag = "saved",
    request_body = CreateSavedSearchRequest,
    responses(
        (status = 201, description = "Created", body = SavedSearch),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody)
    )
)]
pub async fn create_saved_search(
    user: AuthUser,
    State(state): State<AppState>,
    Validated(payload): Validated<CreateSavedSearchRequest>,
) -> ApiResult<(StatusCode, Reply<SavedSearch>)> {
    let search = state.repo.create_saved_search(user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        reply_with(search, "Search saved successfully"),
    ))
}

#[utoipa::path(
    put,
    path = "/api/saved-searches/{id}",
    tag = "saved",
    params(("id" = Uuid, Path, description = "Saved search ID")),
    request_body = UpdateSavedSearchRequest,
    responses(
        (status = 200, description = "Updated", body = SavedSearch),
        (status = 404, description = "Saved search not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_saved_search(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    Validated(payload): Validated<UpdateSavedSearchRequest>,
) -> ApiResult<Reply<SavedSearch>> {
    let search = state
        .repo
        .update_saved_search(id, user.id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Saved search not found"))?;
    Ok(reply_with(search, "Saved search updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/saved-searches/{id}",
    tag = "saved",
    params(("id" = Uuid, Path, description = "Saved search ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Saved search not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_saved_search(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Reply<()>> {
    if !state.repo.delete_saved_search(id, user.id).await? {
        return Err(AppError::not_found("Saved search not found").into());
    }
    Ok(reply_with((), "Saved search deleted successfully"))
}
