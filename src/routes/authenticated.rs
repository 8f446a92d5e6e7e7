use axum::{
    Router,
    routing::{delete, get, post, put},
};

use super::{body, restricted, signed_in};
use crate::{
    AppState,
    auth::LISTING_MANAGERS,
    handlers::{accounts, preferences, properties, saved},
    models::{
        AddFeatureRequest, AddImageRequest, ChangePasswordRequest, CreatePropertyRequest,
        CreateSavedSearchRequest, SavePropertyRequest, UpdatePreferencesRequest,
        UpdateProfileRequest, UpdatePropertyRequest, UpdateSavedSearchRequest,
    },
};

/// Authenticated Router
///
/// Everything that needs a signed-in caller. Handlers receive the identity through
/// `AuthUser`; ownership of a listing is checked in the handler, since it depends on
/// the row being touched.
pub fn authenticated_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // --- Account ---
        .route("/api/auth/me", signed_in(get(accounts::current_user), state))
        .route(
            "/api/users/me",
            body::<UpdateProfileRequest>(signed_in(put(accounts::update_profile), state)),
        )
        .route(
            "/api/users/me",
            signed_in(delete(accounts::delete_account), state),
        )
        .route(
            "/api/users/me/password",
            body::<ChangePasswordRequest>(signed_in(put(accounts::change_password), state)),
        )
        .route(
            "/api/users/me/properties",
            signed_in(get(accounts::my_properties), state),
        )
        // --- Listing management ---
        // Creating a listing is reserved to agents and admins.
        .route(
            "/api/properties",
            body::<CreatePropertyRequest>(restricted(
                post(properties::create_property),
                LISTING_MANAGERS,
                state,
            )),
        )
        .route(
            "/api/properties/{id}",
            body::<UpdatePropertyRequest>(signed_in(put(properties::update_property), state)),
        )
        .route(
            "/api/properties/{id}",
            signed_in(delete(properties::delete_property), state),
        )
        .route(
            "/api/properties/{id}/images",
            body::<AddImageRequest>(signed_in(post(properties::add_image), state)),
        )
        .route(
            "/api/properties/{id}/images/{image_id}",
            signed_in(delete(properties::delete_image), state),
        )
        .route(
            "/api/properties/{id}/features",
            body::<AddFeatureRequest>(signed_in(post(properties::add_feature), state)),
        )
        .route(
            "/api/properties/{id}/features/{feature_id}",
            signed_in(delete(properties::delete_feature), state),
        )
        // --- Saved properties ---
        .route(
            "/api/saved-properties",
            signed_in(get(saved::list_saved_properties), state),
        )
        .route(
            "/api/saved-properties",
            body::<SavePropertyRequest>(signed_in(post(saved::save_property), state)),
        )
        .route(
            "/api/saved-properties/{property_id}",
            signed_in(delete(saved::unsave_property), state),
        )
        // --- Saved searches ---
        .route(
            "/api/saved-searches",
            signed_in(get(saved::list_saved_searches), state),
        )
        .route(
            "/api/saved-searches",
            body::<CreateSavedSearchRequest>(signed_in(post(saved::create_saved_search), state)),
        )
        .route(
            "/api/saved-searches/{id}",
            body::<UpdateSavedSearchRequest>(signed_in(put(saved::update_saved_search), state)),
        )
        .route(
            "/api/saved-searches/{id}",
            signed_in(delete(saved::delete_saved_search), state),
        )
        // --- Notification preferences ---
        .route(
            "/api/notification-preferences",
            signed_in(get(preferences::get_preferences), state),
        )
        .route(
            "/api/notification-preferences",
            body::<UpdatePreferencesRequest>(signed_in(
                put(preferences::update_preferences),
                state,
            )),
        )
}
