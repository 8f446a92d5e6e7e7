#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use listing_portal::{
    AppState, create_router,
    auth::{Identity, Role},
    config::AppConfig,
    models::{
        AddImageRequest, AdminStats, CreatePropertyRequest, CreateSavedSearchRequest, NewUser,
        NotificationPreferences, PriceChange, Property, PropertyFeature, PropertyImage,
        PropertyQuery, SavedProperty, SavedSearch, UpdatePreferencesRequest,
        UpdateProfileRequest, UpdatePropertyRequest, UpdateSavedSearchRequest, UserRow,
    },
    password::hash_password,
    repository::{Repository, RepositoryState, StoreError, StoreResult},
};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

// --- In-memory repository ---

#[derive(Default)]
pub struct Tables {
    pub users: Vec<UserRow>,
    pub properties: Vec<Property>,
    pub images: Vec<PropertyImage>,
    pub features: Vec<PropertyFeature>,
    pub history: Vec<PriceChange>,
    // (user_id, property_id, notes, saved_at)
    pub saved: Vec<(Uuid, Uuid, Option<String>, chrono::DateTime<Utc>)>,
    pub searches: Vec<SavedSearch>,
    pub preferences: HashMap<Uuid, NotificationPreferences>,
}

/// Repository double backed by plain vectors. `fail_next` makes the next call return
/// the given store error, which is how tests reach the normalizer's store branches.
#[derive(Default)]
pub struct MemoryRepo {
    pub tables: Mutex<Tables>,
    pub fail_next: Mutex<Option<StoreError>>,
}

impl MemoryRepo {
    fn check(&self) -> StoreResult<()> {
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn fail_with(&self, err: StoreError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl Repository for MemoryRepo {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(t.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        if t.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Integrity("users_email_lower_idx".into()));
        }
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> StoreResult<Option<UserRow>> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let Some(user) = t.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = req.email {
            user.email = email;
        }
        if req.first_name.is_some() {
            user.first_name = req.first_name;
        }
        if req.last_name.is_some() {
            user.last_name = req.last_name;
        }
        if req.phone.is_some() {
            user.phone = req.phone;
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        match t.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.users.len();
        t.users.retain(|u| u.id != id);
        t.properties.retain(|p| p.owner_id != id);
        t.saved.retain(|s| s.0 != id);
        t.searches.retain(|s| s.user_id != id);
        t.preferences.remove(&id);
        Ok(t.users.len() < before)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        let mut users = t.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<UserRow>> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        Ok(t.users.iter_mut().find(|u| u.id == id).map(|user| {
            user.role = role.as_str().to_string();
            user.clone()
        }))
    }

    async fn get_stats(&self) -> StoreResult<AdminStats> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(AdminStats {
            total_users: t.users.len() as i64,
            total_properties: t.properties.len() as i64,
            active_properties: t.properties.iter().filter(|p| p.status == "active").count()
                as i64,
            total_saved_properties: t.saved.len() as i64,
        })
    }

    async fn search_properties(
        &self,
        filter: &PropertyQuery,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Property>, i64)> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        let status = filter.status.clone().unwrap_or_else(|| "active".to_string());
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };

        let mut matches: Vec<Property> = t
            .properties
            .iter()
            .filter(|p| p.status == status)
            .filter(|p| filter.city.as_ref().is_none_or(|c| p.city.eq_ignore_ascii_case(c)))
            .filter(|p| filter.property_type.as_ref().is_none_or(|v| &p.property_type == v))
            .filter(|p| filter.listing_type.as_ref().is_none_or(|v| &p.listing_type == v))
            .filter(|p| filter.min_price.is_none_or(|v| p.price >= v))
            .filter(|p| filter.max_price.is_none_or(|v| p.price <= v))
            .filter(|p| filter.bedrooms.is_none_or(|v| p.bedrooms >= v))
            .filter(|p| filter.bathrooms.is_none_or(|v| p.bathrooms >= v))
            .filter(|p| {
                filter.search.as_ref().is_none_or(|s| {
                    contains(&p.title, s) || contains(&p.description, s) || contains(&p.address, s)
                })
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn find_property(&self, id: Uuid) -> StoreResult<Option<Property>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(t.properties.iter().find(|p| p.id == id).cloned())
    }

    async fn list_owner_properties(&self, owner_id: Uuid) -> StoreResult<Vec<Property>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(t.properties
            .iter()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_property(
        &self,
        owner_id: Uuid,
        req: CreatePropertyRequest,
    ) -> StoreResult<Property> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let now = Utc::now();
        let property = Property {
            id: Uuid::new_v4(),
            owner_id,
            title: req.title,
            description: req.description,
            property_type: req.property_type,
            listing_type: req.listing_type,
            status: "active".to_string(),
            price: req.price,
            address: req.address,
            city: req.city,
            state: req.state,
            zip_code: req.zip_code,
            bedrooms: req.bedrooms,
            bathrooms: req.bathrooms,
            square_feet: req.square_feet,
            year_built: req.year_built,
            latitude: req.latitude,
            longitude: req.longitude,
            created_at: now,
            updated_at: now,
        };
        for name in req.features.unwrap_or_default() {
            t.features.push(PropertyFeature {
                id: Uuid::new_v4(),
                property_id: property.id,
                name,
            });
        }
        t.history.push(PriceChange {
            id: Uuid::new_v4(),
            property_id: property.id,
            price: property.price,
            previous_price: None,
            changed_at: now,
        });
        t.properties.push(property.clone());
        Ok(property)
    }

    async fn update_property(
        &self,
        id: Uuid,
        req: UpdatePropertyRequest,
    ) -> StoreResult<Option<Property>> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let Some(p) = t.properties.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        let previous_price = p.price;

        if let Some(v) = req.title { p.title = v; }
        if let Some(v) = req.description { p.description = v; }
        if let Some(v) = req.property_type { p.property_type = v; }
        if let Some(v) = req.listing_type { p.listing_type = v; }
        if let Some(v) = req.status { p.status = v; }
        if let Some(v) = req.price { p.price = v; }
        if let Some(v) = req.address { p.address = v; }
        if let Some(v) = req.city { p.city = v; }
        if let Some(v) = req.state { p.state = v; }
        if let Some(v) = req.zip_code { p.zip_code = v; }
        if let Some(v) = req.bedrooms { p.bedrooms = v; }
        if let Some(v) = req.bathrooms { p.bathrooms = v; }
        if req.square_feet.is_some() { p.square_feet = req.square_feet; }
        if req.year_built.is_some() { p.year_built = req.year_built; }
        if req.latitude.is_some() { p.latitude = req.latitude; }
        if req.longitude.is_some() { p.longitude = req.longitude; }
        p.updated_at = Utc::now();

        let updated = p.clone();
        if updated.price != previous_price {
            t.history.push(PriceChange {
                id: Uuid::new_v4(),
                property_id: id,
                price: updated.price,
                previous_price: Some(previous_price),
                changed_at: Utc::now(),
            });
        }
        Ok(Some(updated))
    }

    async fn delete_property(&self, id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.properties.len();
        t.properties.retain(|p| p.id != id);
        t.images.retain(|i| i.property_id != id);
        t.features.retain(|f| f.property_id != id);
        t.history.retain(|h| h.property_id != id);
        t.saved.retain(|s| s.1 != id);
        Ok(t.properties.len() < before)
    }

    async fn price_history(&self, property_id: Uuid) -> StoreResult<Vec<PriceChange>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        // Insertion order is chronological; newest first.
        Ok(t.history
            .iter()
            .rev()
            .filter(|h| h.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn list_images(&self, property_id: Uuid) -> StoreResult<Vec<PropertyImage>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        let mut images: Vec<PropertyImage> = t
            .images
            .iter()
            .filter(|i| i.property_id == property_id)
            .cloned()
            .collect();
        images.sort_by_key(|i| i.sort_order);
        Ok(images)
    }

    async fn add_image(
        &self,
        property_id: Uuid,
        req: AddImageRequest,
    ) -> StoreResult<PropertyImage> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        if req.is_primary {
            for image in t.images.iter_mut().filter(|i| i.property_id == property_id) {
                image.is_primary = false;
            }
        }
        let sort_order = t
            .images
            .iter()
            .filter(|i| i.property_id == property_id)
            .map(|i| i.sort_order + 1)
            .max()
            .unwrap_or(0);
        let image = PropertyImage {
            id: Uuid::new_v4(),
            property_id,
            url: req.url,
            caption: req.caption,
            is_primary: req.is_primary,
            sort_order,
            created_at: Utc::now(),
        };
        t.images.push(image.clone());
        Ok(image)
    }

    async fn delete_image(&self, property_id: Uuid, image_id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.images.len();
        t.images
            .retain(|i| !(i.id == image_id && i.property_id == property_id));
        Ok(t.images.len() < before)
    }

    async fn list_features(&self, property_id: Uuid) -> StoreResult<Vec<PropertyFeature>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(t.features
            .iter()
            .filter(|f| f.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn add_feature(&self, property_id: Uuid, name: &str) -> StoreResult<PropertyFeature> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let feature = PropertyFeature {
            id: Uuid::new_v4(),
            property_id,
            name: name.to_string(),
        };
        t.features.push(feature.clone());
        Ok(feature)
    }

    async fn delete_feature(&self, property_id: Uuid, feature_id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.features.len();
        t.features
            .retain(|f| !(f.id == feature_id && f.property_id == property_id));
        Ok(t.features.len() < before)
    }

    async fn list_saved_properties(&self, user_id: Uuid) -> StoreResult<Vec<SavedProperty>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(t.saved
            .iter()
            .rev()
            .filter(|s| s.0 == user_id)
            .filter_map(|(_, property_id, notes, saved_at)| {
                t.properties
                    .iter()
                    .find(|p| p.id == *property_id)
                    .map(|property| SavedProperty {
                        property: property.clone(),
                        notes: notes.clone(),
                        saved_at: *saved_at,
                    })
            })
            .collect())
    }

    async fn save_property(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        notes: Option<String>,
    ) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        if t.saved.iter().any(|s| s.0 == user_id && s.1 == property_id) {
            return Ok(false);
        }
        t.saved.push((user_id, property_id, notes, Utc::now()));
        Ok(true)
    }

    async fn unsave_property(&self, user_id: Uuid, property_id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.saved.len();
        t.saved.retain(|s| !(s.0 == user_id && s.1 == property_id));
        Ok(t.saved.len() < before)
    }

    async fn list_saved_searches(&self, user_id: Uuid) -> StoreResult<Vec<SavedSearch>> {
        self.check()?;
        let t = self.tables.lock().unwrap();
        Ok(t.searches
            .iter()
            .rev()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_saved_search(
        &self,
        user_id: Uuid,
        req: CreateSavedSearchRequest,
    ) -> StoreResult<SavedSearch> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let now = Utc::now();
        let search = SavedSearch {
            id: Uuid::new_v4(),
            user_id,
            name: req.name,
            criteria: req.criteria,
            email_alerts: req.email_alerts,
            created_at: now,
            updated_at: now,
        };
        t.searches.push(search.clone());
        Ok(search)
    }

    async fn update_saved_search(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateSavedSearchRequest,
    ) -> StoreResult<Option<SavedSearch>> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        Ok(t.searches
            .iter_mut()
            .find(|s| s.id == id && s.user_id == user_id)
            .map(|search| {
                if let Some(name) = req.name {
                    search.name = name;
                }
                if let Some(criteria) = req.criteria {
                    search.criteria = criteria;
                }
                if let Some(alerts) = req.email_alerts {
                    search.email_alerts = alerts;
                }
                search.updated_at = Utc::now();
                search.clone()
            }))
    }

    async fn delete_saved_search(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let before = t.searches.len();
        t.searches.retain(|s| !(s.id == id && s.user_id == user_id));
        Ok(t.searches.len() < before)
    }

    async fn get_or_create_preferences(
        &self,
        user_id: Uuid,
    ) -> StoreResult<NotificationPreferences> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        Ok(t.preferences
            .entry(user_id)
            .or_insert_with(|| NotificationPreferences::defaults_for(user_id))
            .clone())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        req: UpdatePreferencesRequest,
    ) -> StoreResult<NotificationPreferences> {
        self.check()?;
        let mut t = self.tables.lock().unwrap();
        let prefs = t
            .preferences
            .entry(user_id)
            .or_insert_with(|| NotificationPreferences::defaults_for(user_id));
        if let Some(v) = req.email_new_listings { prefs.email_new_listings = v; }
        if let Some(v) = req.email_price_changes { prefs.email_price_changes = v; }
        if let Some(v) = req.email_saved_searches { prefs.email_saved_searches = v; }
        if let Some(v) = req.push_enabled { prefs.push_enabled = v; }
        if let Some(v) = req.frequency { prefs.frequency = v; }
        prefs.updated_at = Utc::now();
        Ok(prefs.clone())
    }
}

// --- Application harness ---

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryRepo>,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let repo = Arc::new(MemoryRepo::default());
        let state = AppState::new(repo.clone() as RepositoryState, AppConfig::default());
        Self {
            router: create_router(state.clone()),
            repo,
            state,
        }
    }

    /// `Cookie` header value carrying a freshly signed token.
    pub fn cookie_for(&self, id: Uuid, role: Role) -> String {
        let token = self
            .state
            .tokens
            .sign(Identity { id, role })
            .expect("token signs");
        format!("token={token}")
    }

    pub async fn seed_user(&self, email: &str, role: Role) -> UserRow {
        self.repo
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: hash_password(PASSWORD).await.expect("hashes"),
                first_name: Some("Test".into()),
                last_name: Some("User".into()),
                phone: None,
                role,
            })
            .await
            .expect("user seeded")
    }

    pub async fn seed_property(&self, owner_id: Uuid, title: &str, price: f64) -> Property {
        self.repo
            .create_property(owner_id, sample_listing(title, price))
            .await
            .expect("property seeded")
    }

    /// Sends one request through the full router and decodes the JSON body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _headers, body) = self.send_raw(request).await;
        (status, body)
    }

    pub async fn send_raw(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, body)
    }
}

pub fn sample_listing(title: &str, price: f64) -> CreatePropertyRequest {
    CreatePropertyRequest {
        title: title.to_string(),
        description: "Bright rooms close to the park".to_string(),
        property_type: "house".to_string(),
        listing_type: "sale".to_string(),
        price,
        address: "12 Elm Street".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        zip_code: "62701".to_string(),
        bedrooms: 3,
        bathrooms: 2.0,
        square_feet: Some(1800),
        year_built: Some(1998),
        latitude: None,
        longitude: None,
        features: Some(vec!["Garage".to_string()]),
    }
}

// --- Request builders ---

pub fn json_request(method: Method, uri: &str, body: Value, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Token signed with the test secret whose expiry is already in the past.
pub fn expired_cookie(app: &TestApp, id: Uuid, role: Role) -> String {
    let now = Utc::now();
    let claims = listing_portal::auth::Claims {
        sub: id,
        role,
        iat: (now - Duration::hours(2)).timestamp() as usize,
        exp: (now - Duration::hours(1)).timestamp() as usize,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(app.state.config.jwt_secret.as_bytes()),
    )
    .expect("token encodes");
    format!("token={token}")
}

pub fn message(body: &Value) -> &str {
    body["message"].as_str().unwrap_or_default()
}
