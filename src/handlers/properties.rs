use axum::{extract::State, http::StatusCode};
use uuid::Uuid;

use super::{Reply, reply, reply_with};
use crate::{
    AppState,
    auth::AuthUser,
    error::{ApiResult, AppError},
    models::{
        AddFeatureRequest, AddImageRequest, CreatePropertyRequest, Pagination, PriceChange,
        Property, PropertyDetails, PropertyFeature, PropertyImage, PropertyPage, PropertyQuery,
        UpdatePropertyRequest,
    },
    repository::Repository,
    validation::{PathParam, Validated},
};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

async fn existing_property(repo: &dyn Repository, id: Uuid) -> ApiResult<Property> {
    repo.find_property(id)
        .await?
        .ok_or_else(|| AppError::not_found("Property not found").into())
}

/// Loads the listing and checks the caller may change it: its owner or any admin.
async fn managed_property(
    repo: &dyn Repository,
    id: Uuid,
    user: AuthUser,
    denied: &'static str,
) -> ApiResult<Property> {
    let property = existing_property(repo, id).await?;
    if property.owner_id != user.id && !user.is_admin() {
        tracing::warn!(property_id = %id, user_id = %user.id, "ownership check failed");
        return Err(AppError::forbidden(denied).into());
    }
    Ok(property)
}

// --- Browsing ---

/// list_properties
///
/// [Public Route] Filtered, paginated search over listings, newest first. Only
/// `active` listings are returned unless `status` says otherwise.
#[utoipa::path(
    get,
    path = "/api/properties",
    tag = "properties",
    params(PropertyQuery),
    responses(
        (status = 200, description = "One page of listings", body = PropertyPage),
        (status = 400, description = "Invalid query parameters", body = crate::error::ErrorBody)
    )
)]
pub async fn list_properties(
    State(state): State<AppState>,
    Validated(query): Validated<PropertyQuery>,
) -> ApiResult<Reply<PropertyPage>> {
    let page = query.page.unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::validation("Page is out of range"))?;

    let (properties, total) = state.repo.search_properties(&query, limit, offset).await?;

    Ok(reply(PropertyPage {
        properties,
        pagination: Pagination::new(page, limit, total),
    }))
}

/// get_property
///
/// [Public Route] One listing with its images (in display order) and features.
#[utoipa::path(
    get,
    path = "/api/properties/{id}",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Found", body = PropertyDetails),
        (status = 404, description = "Property not found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_property(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Reply<PropertyDetails>> {
    let property = existing_property(state.repo.as_ref(), id).await?;
    let images = state.repo.list_images(id).await?;
    let features = state.repo.list_features(id).await?;

    Ok(reply(PropertyDetails {
        property,
        images,
        features,
    }))
}

/// price_history
///
/// [Public Route] Every recorded price of a listing, newest first.
#[utoipa::path(
    get,
    path = "/api/properties/{id}/price-history",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Price history", body = [PriceChange]),
        (status = 404, description = "Property not found", body = crate::error::ErrorBody)
    )
)]
pub async fn price_history(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Reply<Vec<PriceChange>>> {
    existing_property(state.repo.as_ref(), id).await?;
    Ok(reply(state.repo.price_history(id).await?))
}

// --- Listing management ---

/// create_property
///
/// [Agent/Admin Route] Publishes a listing owned by the caller. The starting price is
/// the first entry of its price history.
#[utoipa::path(
    post,
    path = "/api/properties",
    tag = "properties",
    request_body = CreatePropertyRequest,
    responses(
        (status = 201, description = "Created", body = Property),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody),
        (status = 403, description = "Role not permitted", body = crate::error::ErrorBody)
    )
)]
pub async fn create_property(
    user: AuthUser,
    State(state): State<AppState>,
    Validated(payload): Validated<CreatePropertyRequest>,
) -> ApiResult<(StatusCode, Reply<Property>)> {
    let property = state.repo.create_property(user.id, payload).await?;
    tracing::info!(property_id = %property.id, owner_id = %user.id, "listing created");
    Ok((
        StatusCode::CREATED,
        reply_with(property, "Property created successfully"),
    ))
}

/// update_property
///
/// [Authenticated Route] Partial update by the owner or an admin. A price change is
/// appended to the price history together with the price it replaces.
#[utoipa::path(
    put,
    path = "/api/properties/{id}",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property ID")),
    request_body = UpdatePropertyRequest,
    responses(
        (status = 200, description = "Updated", body = Property),
        (status = 403, description = "Not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Property not found", body = crate::error::ErrorBody)
    )
)]
pub async fn update_property(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    Validated(payload): Validated<UpdatePropertyRequest>,
) -> ApiResult<Reply<Property>> {
    managed_property(
        state.repo.as_ref(),
        id,
        user,
        "Not authorized to update this property",
    )
    .await?;

    let property = state
        .repo
        .update_property(id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("Property not found"))?;
    Ok(reply_with(property, "Property updated successfully"))
}

/// delete_property
///
/// [Authenticated Route] Removes a listing (owner or admin). Images, features, price
/// history and bookmarks go with it.
#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Property not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_property(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Reply<()>> {
    managed_property(
        state.repo.as_ref(),
        id,
        user,
        "Not authorized to delete this property",
    )
    .await?;

    if !state.repo.delete_property(id).await? {
        return Err(AppError::not_found("Property not found").into());
    }
    tracing::info!(property_id = %id, user_id = %user.id, "listing deleted");
    Ok(reply_with((), "Property deleted successfully"))
}

// --- Images ---

#[utoipa::path(
    post,
    path = "/api/properties/{id}/images",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property ID")),
    request_body = AddImageRequest,
    responses(
        (status = 201, description = "Image attached", body = PropertyImage),
        (status = 403, description = "Not the owner", body = crate::error::ErrorBody),
        (status = 404, description = "Property not found", body = crate::error::ErrorBody)
    )
)]
pub async fn add_image(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    Validated(payload): Validated<AddImageRequest>,
) -> ApiResult<(StatusCode, Reply<PropertyImage>)> {
    managed_property(
        state.repo.as_ref(),
        id,
        user,
        "Not authorized to modify this property",
    )
    .await?;

    let image = state.repo.add_image(id, payload).await?;
    Ok((
        StatusCode::CREATED,
        reply_with(image, "Image added successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/properties/{id}/images/{image_id}",
    tag = "properties",
    params(
        ("id" = Uuid, Path, description = "Property ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image removed"),
        (status = 404, description = "Image not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_image(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam((id, image_id)): PathParam<(Uuid, Uuid)>,
) -> ApiResult<Reply<()>> {
    managed_property(
        state.repo.as_ref(),
        id,
        user,
        "Not authorized to modify this property",
    )
    .await?;

    if !state.repo.delete_image(id, image_id).await? {
        return Err(AppError::not_found("Image not found").into());
    }
    Ok(reply_with((), "Image deleted successfully"))
}

// --- Features ---

/// add_feature
///
/// Feature names are unique per listing, compared case-insensitively.
#[utoipa::path(
    post,
    path = "/api/properties/{id}/features",
    tag = "properties",
    params(("id" = Uuid, Path, description = "Property ID")),
    request_body = AddFeatureRequest,
    responses(
        (status = 201, description = "Feature added", body = PropertyFeature),
        (status = 400, description = "Feature already exists for this property", body = crate::error::ErrorBody)
    )
)]
pub async fn add_feature(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    Validated(payload): Validated<AddFeatureRequest>,
) -> ApiResult<(StatusCode, Reply<PropertyFeature>)> {
    managed_property(
        state.repo.as_ref(),
        id,
        user,
        "Not authorized to modify this property",
    )
    .await?;

    let name = payload.name.trim();
    let existing = state.repo.list_features(id).await?;
    if existing.iter().any(|f| f.name.eq_ignore_ascii_case(name)) {
        return Err(AppError::conflict("Feature already exists for this property").into());
    }

    let feature = state.repo.add_feature(id, name).await?;
    Ok((
        StatusCode::CREATED,
        reply_with(feature, "Feature added successfully"),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/properties/{id}/features/{feature_id}",
    tag = "properties",
    params(
        ("id" = Uuid, Path, description = "Property ID"),
        ("feature_id" = Uuid, Path, description = "Feature ID")
    ),
    responses(
        (status = 200, description = "Feature removed"),
        (status = 404, description = "Feature not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_feature(
    user: AuthUser,
    State(state): State<AppState>,
    PathParam((id, feature_id)): PathParam<(Uuid, Uuid)>,
) -> ApiResult<Reply<()>> {
    managed_property(
        state.repo.as_ref(),
        id,
        user,
        "Not authorized to modify this property",
    )
    .await?;

    if !state.repo.delete_feature(id, feature_id).await? {
        return Err(AppError::not_found("Feature not found").into());
    }
    Ok(reply_with((), "Feature deleted successfully"))
}
