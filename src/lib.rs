use axum::{Router, extract::FromRef, http::HeaderName};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// The request pipeline: validation, authentication/authorization, error normalization.
pub mod auth;
pub mod error;
pub mod schemas;
pub mod validation;

// Application services and components.
pub mod config;
pub mod handlers;
pub mod models;
pub mod password;
pub mod repository;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::TokenService;
pub use config::AppConfig;
pub use error::{ApiError, ApiResult, AppError};
pub use repository::{PostgresRepository, Repository, RepositoryState};

/// ApiDoc
///
/// The OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::accounts::register, handlers::accounts::login, handlers::accounts::logout,
        handlers::accounts::current_user, handlers::accounts::update_profile,
        handlers::accounts::change_password, handlers::accounts::delete_account,
        handlers::accounts::my_properties,
        handlers::properties::list_properties, handlers::properties::get_property,
        handlers::properties::price_history, handlers::properties::create_property,
        handlers::properties::update_property, handlers::properties::delete_property,
        handlers::properties::add_image, handlers::properties::delete_image,
        handlers::properties::add_feature, handlers::properties::delete_feature,
        handlers::saved::list_saved_properties, handlers::saved::save_property,
        handlers::saved::unsave_property, handlers::saved::list_saved_searches,
        handlers::saved::create_saved_search, handlers::saved::update_saved_search,
        handlers::saved::delete_saved_search,
        handlers::preferences::get_preferences, handlers::preferences::update_preferences,
        handlers::admin::list_users, handlers::admin::update_user_role,
        handlers::admin::delete_user, handlers::admin::get_stats,
    ),
    components(
        schemas(
            models::UserProfile, models::AuthSession, models::RegisterRequest,
            models::LoginRequest, models::UpdateProfileRequest, models::ChangePasswordRequest,
            models::UpdateRoleRequest, models::Property, models::PropertyImage,
            models::PropertyFeature, models::PriceChange, models::PropertyDetails,
            models::PropertyPage, models::Pagination, models::CreatePropertyRequest,
            models::UpdatePropertyRequest, models::AddImageRequest, models::AddFeatureRequest,
            models::SavedProperty, models::SavePropertyRequest, models::SavedSearch,
            models::CreateSavedSearchRequest, models::UpdateSavedSearchRequest,
            models::NotificationPreferences, models::UpdatePreferencesRequest,
            models::AdminStats, handlers::Health, error::ErrorBody,
        )
    ),
    tags(
        (name = "listing-portal", description = "Real-estate listing API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, immutable container shared by every request: the repository handle,
/// the token service (built from the secret once at startup) and the configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub tokens: TokenService,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: TokenService::from_config(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---
// The authentication gate only needs the token service.

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

/// create_router
///
/// Assembles every route with its gates, the not-found fallback, the documentation
/// UI and the global observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes(&state))
        .nest("/api/admin", admin::admin_routes(&state))
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::route_not_found)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by
/// `SetRequestIdLayer`, so every event of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
