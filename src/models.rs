use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Role;

// --- Core Application Schemas (Mapped to Database) ---

/// UserRow
///
/// The raw `users` table row, including the Argon2 password hash. Internal only: it is
/// never serialized. Handlers convert it into `UserProfile` before responding.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    // 'user', 'agent' or 'admin'.
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// UserProfile
///
/// Public view of an account (no credentials).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

/// NewUser
///
/// Everything the repository needs to insert an account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

/// Property
///
/// A listing from the `properties` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Property {
    pub id: Uuid,
    // FK to users.id (the listing agent or owner).
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    /// house | apartment | condo | townhouse | land | commercial
    pub property_type: String,
    /// sale | rent
    pub listing_type: String,
    /// active | pending | sold | rented | inactive
    pub status: String,
    pub price: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub square_feet: Option<i32>,
    pub year_built: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct PropertyImage {
    pub id: Uuid,
    pub property_id: Uuid,
    pub url: String,
    pub caption: Option<String>,
    pub is_primary: bool,
    pub sort_order: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct PropertyFeature {
    pub id: Uuid,
    pub property_id: Uuid,
    pub name: String,
}

/// PriceChange
///
/// One entry of a listing's price history. The first entry (recorded on creation) has
/// no previous price.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct PriceChange {
    pub id: Uuid,
    pub property_id: Uuid,
    pub price: f64,
    pub previous_price: Option<f64>,
    #[ts(type = "string")]
    pub changed_at: DateTime<Utc>,
}

/// PropertyDetails
///
/// Output schema for GET /api/properties/{id}: the listing plus its media and features.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PropertyDetails {
    pub property: Property,
    pub images: Vec<PropertyImage>,
    pub features: Vec<PropertyFeature>,
}

/// SavedProperty
///
/// A bookmarked listing joined with the listing itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct SavedProperty {
    #[sqlx(flatten)]
    pub property: Property,
    pub notes: Option<String>,
    #[ts(type = "string")]
    pub saved_at: DateTime<Utc>,
}

/// SavedSearch
///
/// A named set of listing filters. `criteria` is stored as JSONB and returned untouched.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct SavedSearch {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub criteria: serde_json::Value,
    pub email_alerts: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq)]
#[ts(export)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    pub email_new_listings: bool,
    pub email_price_changes: bool,
    pub email_saved_searches: bool,
    pub push_enabled: bool,
    /// instant | daily | weekly
    pub frequency: String,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl NotificationPreferences {
    /// The preferences every account starts with.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            email_new_listings: true,
            email_price_changes: true,
            email_saved_searches: true,
            push_enabled: false,
            frequency: "instant".to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// AdminStats
///
/// Output schema for GET /api/admin/stats.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_properties: i64,
    pub active_properties: i64,
    pub total_saved_properties: i64,
}

/// AuthSession
///
/// Returned by register and login. The token is also set as the `token` cookie.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: String,
}

// --- Request Payloads (Input Schemas) ---
// Each payload is only built after its rule set (see `schemas`) has accepted the raw JSON.

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    #[schema(example = "jane@example.com")]
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    /// 'user' (default) or 'agent'. Admins are promoted, never self-registered.
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreatePropertyRequest {
    pub title: String,
    pub description: String,
    pub property_type: String,
    pub listing_type: String,
    pub price: f64,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub bedrooms: i32,
    pub bathrooms: f64,
    pub square_feet: Option<i32>,
    pub year_built: Option<i32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub features: Option<Vec<String>>,
}

/// UpdatePropertyRequest
///
/// Partial update payload (PUT /api/properties/{id}); only provided fields change.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePropertyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub square_feet: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_built: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AddImageRequest {
    #[schema(example = "https://cdn.example.com/listing/front.jpg")]
    pub url: String,
    pub caption: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AddFeatureRequest {
    #[schema(example = "Swimming pool")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SavePropertyRequest {
    pub property_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateSavedSearchRequest {
    pub name: String,
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub criteria: serde_json::Value,
    #[serde(default)]
    pub email_alerts: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateSavedSearchRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "Record<string, unknown> | null")]
    #[schema(value_type = Option<Object>)]
    pub criteria: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_alerts: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdatePreferencesRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_new_listings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_price_changes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_saved_searches: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
}

/// PropertyQuery
///
/// Query parameters accepted by GET /api/properties.
#[derive(Debug, Clone, Serialize, Deserialize, Default, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PropertyQuery {
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    /// Defaults to `active` when omitted.
    pub status: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Minimum number of bedrooms.
    pub bedrooms: Option<i32>,
    /// Minimum number of bathrooms.
    pub bathrooms: Option<f64>,
    /// Free-text match over title, description and address.
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// --- Response Envelopes ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PropertyPage {
    pub properties: Vec<Property>,
    pub pagination: Pagination,
}

/// Success
///
/// The `{status: "success", data, message?}` envelope every successful response uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Success<T> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Success<T> {
    pub fn new(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.into()),
            data,
        }
    }
}
