//! Per-route validation rule sets.
//!
//! Each request type is bound to its rules through `Schema`. Rules are evaluated
//! against the raw JSON (or query string) before the typed value is built, and
//! messages are reported in the order they are declared here.

use std::sync::LazyLock;

use crate::{
    models::{
        AddFeatureRequest, AddImageRequest, ChangePasswordRequest, CreatePropertyRequest,
        CreateSavedSearchRequest, LoginRequest, PropertyQuery, RegisterRequest,
        SavePropertyRequest, UpdatePreferencesRequest, UpdateProfileRequest,
        UpdatePropertyRequest, UpdateRoleRequest, UpdateSavedSearchRequest,
    },
    validation::{Check, FieldRules, RuleSet, Schema},
};

pub const PROPERTY_TYPES: &[&str] = &[
    "house",
    "apartment",
    "condo",
    "townhouse",
    "land",
    "commercial",
];
pub const LISTING_TYPES: &[&str] = &["sale", "rent"];
pub const PROPERTY_STATUSES: &[&str] = &["active", "pending", "sold", "rented", "inactive"];
pub const SELF_ASSIGNABLE_ROLES: &[&str] = &["user", "agent"];
pub const ALL_ROLES: &[&str] = &["user", "agent", "admin"];
pub const FREQUENCIES: &[&str] = &["instant", "daily", "weekly"];

const INVALID_EMAIL: &str = "Please provide a valid email address";
const PASSWORD_TOO_SHORT: &str = "Password must be at least 8 characters long";

macro_rules! schema {
    ($ty:ty => $rules:expr) => {
        impl Schema for $ty {
            fn rules() -> &'static RuleSet {
                static RULES: LazyLock<RuleSet> = LazyLock::new(|| $rules);
                &RULES
            }
        }
    };
}

// --- Accounts ---

schema!(RegisterRequest => RuleSet::new(vec![
    FieldRules::field("email").check(Check::Email, INVALID_EMAIL),
    FieldRules::field("password").check(Check::MinLength(8), PASSWORD_TOO_SHORT),
    FieldRules::optional("first_name")
        .check(Check::MaxLength(50), "First name must be at most 50 characters"),
    FieldRules::optional("last_name")
        .check(Check::MaxLength(50), "Last name must be at most 50 characters"),
    FieldRules::optional("phone")
        .check(Check::MaxLength(20), "Phone number must be at most 20 characters"),
    FieldRules::optional("role")
        .check(Check::OneOf(SELF_ASSIGNABLE_ROLES), "Role must be either user or agent"),
]));

schema!(LoginRequest => RuleSet::new(vec![
    FieldRules::field("email").check(Check::Email, INVALID_EMAIL),
    FieldRules::field("password").check(Check::Required, "Password is required"),
]));

schema!(UpdateProfileRequest => RuleSet::new(vec![
    FieldRules::optional("email").check(Check::Email, INVALID_EMAIL),
    FieldRules::optional("first_name")
        .check(Check::MaxLength(50), "First name must be at most 50 characters"),
    FieldRules::optional("last_name")
        .check(Check::MaxLength(50), "Last name must be at most 50 characters"),
    FieldRules::optional("phone")
        .check(Check::MaxLength(20), "Phone number must be at most 20 characters"),
]));

schema!(ChangePasswordRequest => RuleSet::new(vec![
    FieldRules::field("current_password")
        .check(Check::Required, "Current password is required"),
    FieldRules::field("new_password")
        .check(Check::MinLength(8), "New password must be at least 8 characters long"),
]));

schema!(UpdateRoleRequest => RuleSet::new(vec![
    FieldRules::field("role")
        .check(Check::OneOf(ALL_ROLES), "Role must be one of user, agent or admin"),
]));

// --- Listings ---

schema!(CreatePropertyRequest => RuleSet::new(vec![
    FieldRules::field("title")
        .check(Check::Required, "Title is required")
        .check(Check::MaxLength(200), "Title must be at most 200 characters"),
    FieldRules::field("description").check(Check::Required, "Description is required"),
    FieldRules::field("property_type")
        .check(Check::OneOf(PROPERTY_TYPES), "Invalid property type"),
    FieldRules::field("listing_type")
        .check(Check::OneOf(LISTING_TYPES), "Listing type must be either sale or rent"),
    FieldRules::field("price").check(Check::Min(0.0), "Price must be a non-negative number"),
    FieldRules::field("address").check(Check::Required, "Address is required"),
    FieldRules::field("city").check(Check::Required, "City is required"),
    FieldRules::field("state").check(Check::Required, "State is required"),
    FieldRules::field("zip_code").check(Check::Required, "Zip code is required"),
    FieldRules::field("bedrooms")
        .check(Check::Integer, "Bedrooms must be a whole number")
        .check(Check::Min(0.0), "Bedrooms cannot be negative"),
    FieldRules::field("bathrooms")
        .check(Check::Min(0.0), "Bathrooms must be a non-negative number"),
    FieldRules::optional("square_feet")
        .check(Check::Integer, "Square feet must be a whole number")
        .check(Check::Min(1.0), "Square feet must be positive"),
    FieldRules::optional("year_built")
        .check(Check::Integer, "Year built must be a whole number")
        .check(Check::Min(1800.0), "Year built must be 1800 or later"),
    FieldRules::optional("latitude")
        .check(Check::Min(-90.0), "Latitude must be between -90 and 90")
        .check(Check::Max(90.0), "Latitude must be between -90 and 90"),
    FieldRules::optional("longitude")
        .check(Check::Min(-180.0), "Longitude must be between -180 and 180")
        .check(Check::Max(180.0), "Longitude must be between -180 and 180"),
    FieldRules::optional("features")
        .check(Check::StringArray, "Features must be a list of names"),
]));

schema!(UpdatePropertyRequest => RuleSet::new(vec![
    FieldRules::optional("title")
        .check(Check::NotBlank, "Title cannot be empty")
        .check(Check::MaxLength(200), "Title must be at most 200 characters"),
    FieldRules::optional("property_type")
        .check(Check::OneOf(PROPERTY_TYPES), "Invalid property type"),
    FieldRules::optional("listing_type")
        .check(Check::OneOf(LISTING_TYPES), "Listing type must be either sale or rent"),
    FieldRules::optional("status").check(Check::OneOf(PROPERTY_STATUSES), "Invalid status"),
    FieldRules::optional("price").check(Check::Min(0.0), "Price must be a non-negative number"),
    FieldRules::optional("bedrooms")
        .check(Check::Integer, "Bedrooms must be a whole number")
        .check(Check::Min(0.0), "Bedrooms cannot be negative"),
    FieldRules::optional("bathrooms")
        .check(Check::Min(0.0), "Bathrooms must be a non-negative number"),
    FieldRules::optional("square_feet")
        .check(Check::Integer, "Square feet must be a whole number")
        .check(Check::Min(1.0), "Square feet must be positive"),
    FieldRules::optional("year_built")
        .check(Check::Integer, "Year built must be a whole number")
        .check(Check::Min(1800.0), "Year built must be 1800 or later"),
    FieldRules::optional("latitude")
        .check(Check::Min(-90.0), "Latitude must be between -90 and 90")
        .check(Check::Max(90.0), "Latitude must be between -90 and 90"),
    FieldRules::optional("longitude")
        .check(Check::Min(-180.0), "Longitude must be between -180 and 180")
        .check(Check::Max(180.0), "Longitude must be between -180 and 180"),
]));

schema!(PropertyQuery => RuleSet::new(vec![
    FieldRules::optional("property_type")
        .check(Check::OneOf(PROPERTY_TYPES), "Invalid property type"),
    FieldRules::optional("listing_type")
        .check(Check::OneOf(LISTING_TYPES), "Listing type must be either sale or rent"),
    FieldRules::optional("status").check(Check::OneOf(PROPERTY_STATUSES), "Invalid status"),
    FieldRules::optional("min_price")
        .check(Check::Min(0.0), "Minimum price must be a non-negative number"),
    FieldRules::optional("max_price")
        .check(Check::Min(0.0), "Maximum price must be a non-negative number"),
    FieldRules::optional("bedrooms")
        .check(Check::Integer, "Bedrooms must be a whole number")
        .check(Check::Min(0.0), "Bedrooms cannot be negative"),
    FieldRules::optional("bathrooms")
        .check(Check::Min(0.0), "Bathrooms must be a non-negative number"),
    FieldRules::optional("page")
        .check(Check::Integer, "Page must be a whole number")
        .check(Check::Min(1.0), "Page must be at least 1"),
    FieldRules::optional("limit")
        .check(Check::Integer, "Limit must be a whole number")
        .check(Check::Min(1.0), "Limit must be between 1 and 100")
        .check(Check::Max(100.0), "Limit must be between 1 and 100"),
]));

schema!(AddImageRequest => RuleSet::new(vec![
    FieldRules::field("url").check(Check::Url, "Image URL must be a valid http(s) URL"),
    FieldRules::optional("caption")
        .check(Check::MaxLength(200), "Caption must be at most 200 characters"),
    FieldRules::optional("is_primary").check(Check::Boolean, "is_primary must be a boolean"),
]));

schema!(AddFeatureRequest => RuleSet::new(vec![
    FieldRules::field("name")
        .check(Check::Required, "Feature name is required")
        .check(Check::MaxLength(100), "Feature name must be at most 100 characters"),
]));

// --- Saved items & preferences ---

schema!(SavePropertyRequest => RuleSet::new(vec![
    FieldRules::field("property_id").check(Check::Uuid, "A valid property id is required"),
    FieldRules::optional("notes")
        .check(Check::MaxLength(500), "Notes must be at most 500 characters"),
]));

schema!(CreateSavedSearchRequest => RuleSet::new(vec![
    FieldRules::field("name")
        .check(Check::Required, "Search name is required")
        .check(Check::MaxLength(100), "Search name must be at most 100 characters"),
    FieldRules::field("criteria").check(Check::Object, "Search criteria must be an object"),
    FieldRules::optional("email_alerts")
        .check(Check::Boolean, "email_alerts must be a boolean"),
]));

schema!(UpdateSavedSearchRequest => RuleSet::new(vec![
    FieldRules::optional("name")
        .check(Check::NotBlank, "Search name cannot be empty")
        .check(Check::MaxLength(100), "Search name must be at most 100 characters"),
    FieldRules::optional("criteria").check(Check::Object, "Search criteria must be an object"),
    FieldRules::optional("email_alerts")
        .check(Check::Boolean, "email_alerts must be a boolean"),
]));

schema!(UpdatePreferencesRequest => RuleSet::new(vec![
    FieldRules::optional("email_new_listings")
        .check(Check::Boolean, "email_new_listings must be a boolean"),
    FieldRules::optional("email_price_changes")
        .check(Check::Boolean, "email_price_changes must be a boolean"),
    FieldRules::optional("email_saved_searches")
        .check(Check::Boolean, "email_saved_searches must be a boolean"),
    FieldRules::optional("push_enabled").check(Check::Boolean, "push_enabled must be a boolean"),
    FieldRules::optional("frequency")
        .check(Check::OneOf(FREQUENCIES), "Frequency must be instant, daily or weekly"),
]));
