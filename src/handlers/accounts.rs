use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};

use super::{Reply, identity_of, reply, reply_with};
use crate::{
    AppState,
    auth::{AuthUser, Role, clear_session_cookie, session_cookie},
    error::{ApiResult, AppError},
    models::{
        AuthSession, ChangePasswordRequest, LoginRequest, NewUser, Property, RegisterRequest,
        Success, UpdateProfileRequest, UserProfile, UserRow,
    },
    password::{hash_password, verify_password},
    validation::Validated,
};

/// Signs a token for `user` and builds the `Set-Cookie` header carrying it.
fn start_session(
    state: &AppState,
    user: UserRow,
    message: &str,
) -> ApiResult<(header::HeaderName, axum::http::HeaderValue, Reply<AuthSession>)> {
    let identity = identity_of(&user)?;
    let token = state.tokens.sign(identity)?;
    let cookie = session_cookie(&token, state.tokens.ttl(), &state.config.env)?;

    tracing::info!(user_id = %identity.id, role = %identity.role, "session issued");

    let session = AuthSession {
        user: user.into(),
        token,
    };
    Ok((header::SET_COOKIE, cookie, reply_with(session, message)))
}

// --- Authentication ---

/// register
///
/// [Public Route] Creates an account and signs the caller in.
///
/// Self-registration may only pick `user` or `agent`; admins are promoted through the
/// admin surface. A taken email is reported explicitly (400), unlike login.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, token cookie set", body = AuthSession),
        (status = 400, description = "Validation failure or email already registered", body = crate::error::ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Validated(payload): Validated<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = payload.email.trim().to_lowercase();

    if state.repo.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::conflict("Email already registered").into());
    }

    let role = match payload.role.as_deref() {
        Some(role) => role.parse::<Role>()?,
        None => Role::User,
    };

    let user = state
        .repo
        .create_user(NewUser {
            email,
            password_hash: hash_password(&payload.password).await?,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            role,
        })
        .await?;

    let (name, cookie, body) = start_session(&state, user, "User registered successfully")?;
    Ok((StatusCode::CREATED, [(name, cookie)], body))
}

/// login
///
/// [Public Route] Exchanges credentials for a token cookie. An unknown email and a
/// wrong password produce the same 401.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in, token cookie set", body = AuthSession),
        (status = 401, description = "Invalid email or password", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Validated(payload): Validated<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || AppError::unauthorized("Invalid email or password");

    let user = state
        .repo
        .find_user_by_email(payload.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&user.password_hash, &payload.password).await? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid().into());
    }

    let (name, cookie, body) = start_session(&state, user, "Login successful")?;
    Ok(([(name, cookie)], body))
}

/// logout
///
/// [Public Route] Expires the token cookie. Tokens are stateless, so nothing is revoked
/// server-side.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Cookie cleared"))
)]
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(Success::with_message((), "Logged out successfully")),
    )
}

/// current_user
///
/// [Authenticated Route] The caller's own profile, read fresh from the store.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not signed in", body = crate::error::ErrorBody),
        (status = 404, description = "Account no longer exists", body = crate::error::ErrorBody)
    )
)]
pub async fn current_user(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Reply<UserProfile>> {
    let row = state
        .repo
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(reply(row.into()))
}

// --- Profile management ---

/// update_profile
///
/// [Authenticated Route] Partial update of the caller's profile.
#[utoipa::path(
    put,
    path = "/api/users/me",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Validation failure or email already in use", body = crate::error::ErrorBody)
    )
)]
pub async fn update_profile(
    user: AuthUser,
    State(state): State<AppState>,
    Validated(mut payload): Validated<UpdateProfileRequest>,
) -> ApiResult<Reply<UserProfile>> {
    if let Some(email) = payload.email.as_mut() {
        *email = email.trim().to_lowercase();
        if let Some(existing) = state.repo.find_user_by_email(email).await? {
            if existing.id != user.id {
                return Err(AppError::conflict("Email already in use").into());
            }
        }
    }

    let row = state
        .repo
        .update_user_profile(user.id, payload)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(reply_with(row.into(), "Profile updated successfully"))
}

/// change_password
///
/// [Authenticated Route] Requires the current password; the new one is re-hashed.
#[utoipa::path(
    put,
    path = "/api/users/me/password",
    tag = "users",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Current password is incorrect", body = crate::error::ErrorBody)
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    Validated(payload): Validated<ChangePasswordRequest>,
) -> ApiResult<Reply<()>> {
    let row = state
        .repo
        .find_user_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if !verify_password(&row.password_hash, &payload.current_password).await? {
        return Err(AppError::unauthorized("Current password is incorrect").into());
    }

    let hash = hash_password(&payload.new_password).await?;
    if !state.repo.update_password(user.id, &hash).await? {
        return Err(AppError::not_found("User not found").into());
    }

    tracing::info!(user_id = %user.id, "password changed");
    Ok(reply_with((), "Password updated successfully"))
}

/// delete_account
///
/// [Authenticated Route] Removes the caller's account (listings, saved items and
/// preferences cascade) and clears the cookie.
#[utoipa::path(
    delete,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Account deleted"),
        (status = 404, description = "User not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_account(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    if !state.repo.delete_user(user.id).await? {
        return Err(AppError::not_found("User not found").into());
    }

    tracing::info!(user_id = %user.id, "account deleted");
    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        reply_with((), "Account deleted successfully"),
    ))
}

/// my_properties
///
/// [Authenticated Route] Every listing owned by the caller, whatever its status.
#[utoipa::path(
    get,
    path = "/api/users/me/properties",
    tag = "users",
    responses((status = 200, description = "Owned listings", body = [Property]))
)]
pub async fn my_properties(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<Reply<Vec<Property>>> {
    Ok(reply(state.repo.list_owner_properties(user.id).await?))
}
