use std::{fmt, str::FromStr, time::Duration};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{ApiError, ApiResult, AppError},
};

/// Name of the cookie carrying the signed token.
pub const AUTH_COOKIE: &str = "token";

/// Roles allowed to create and manage listings.
pub const LISTING_MANAGERS: &[Role] = &[Role::Agent, Role::Admin];
/// Roles allowed on the `/api/admin` surface.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// Role
///
/// The RBAC role carried in every token and stored on every account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "agent" => Ok(Role::Agent),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::validation(format!("Unknown role: {other}"))),
        }
    }
}

/// Claims
///
/// The JWT payload. `sub` and `role` form the Authenticated Identity; `exp` is always
/// validated.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
}

/// Identity
///
/// The decoded, verified requester for the duration of one request. Attached to the
/// request extensions by `authenticate` and only by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
}

/// TokenService
///
/// Signs and verifies tokens with the process-wide secret. Built once from `AppConfig`
/// at startup and shared read-only through the application state.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.jwt_secret, config.jwt_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn sign(&self, identity: Identity) -> ApiResult<String> {
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: identity.id,
            role: identity.role,
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(ApiError::unexpected)
    }

    /// Verifies signature and expiry. Every failure cause yields the same error.
    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| Identity {
                id: data.claims.sub,
                role: data.claims.role,
            })
            .map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "token rejected");
                AppError::unauthorized("Invalid or expired token")
            })
    }
}

/// Reads one cookie value out of the `Cookie` header(s).
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value that stores the token. HttpOnly always; `Secure` outside local.
pub fn session_cookie(token: &str, max_age: Duration, env: &Env) -> ApiResult<HeaderValue> {
    let secure = if *env == Env::Production { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{AUTH_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{secure}",
        max_age.as_secs()
    ))
    .map_err(ApiError::unexpected)
}

/// `Set-Cookie` value that expires the token cookie.
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static(
        "token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
    )
}

/// authenticate
///
/// Authentication Gate. Reads the `token` cookie, verifies it and attaches the
/// resulting `Identity` to the request. Never touches the data store; handlers that
/// need the user row fetch it themselves.
pub async fn authenticate(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let token = read_cookie(request.headers(), AUTH_COOKIE)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("No authentication token provided"))?;

    let identity = tokens.verify(&token)?;
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// authorize
///
/// Authorization Gate. `roles` is fixed when the route is registered. Must run after
/// `authenticate`; a missing identity is reported as 401.
pub async fn authorize(
    roles: &'static [Role],
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::unauthorized("User not authenticated"))?;

    if !roles.contains(&identity.role) {
        return Err(AppError::forbidden("Not authorized to access this resource").into());
    }

    Ok(next.run(request).await)
}

/// AuthUser
///
/// Handler-side view of the Authenticated Identity. Only resolvable on routes that sit
/// behind `authenticate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Identity> for AuthUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            role: identity.role,
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .map(AuthUser::from)
            .ok_or_else(|| AppError::unauthorized("User not authenticated").into())
    }
}

