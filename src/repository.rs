use crate::{
    auth::Role,
    models::{
        AddImageRequest, AdminStats, CreatePropertyRequest, CreateSavedSearchRequest, NewUser,
        NotificationPreferences, PriceChange, Property, PropertyFeature, PropertyImage,
        PropertyQuery, SavedProperty, SavedSearch, UpdatePreferencesRequest,
        UpdateProfileRequest, UpdatePropertyRequest, UpdateSavedSearchRequest, UserRow,
    },
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, error::ErrorKind, query_builder::QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

/// StoreError
///
/// The two ways the data store can fail, as far as the rest of the application cares:
/// an integrity/constraint violation (reported to clients as a generic 400) or anything
/// else (a generic 500). "Not found" is not an error here; lookups return `Option`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("integrity constraint violated: {0}")]
    Integrity(String),

    #[error(transparent)]
    Unavailable(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            ) {
                return StoreError::Integrity(db.message().to_string());
            }
        }
        StoreError::Unavailable(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers only ever see
/// `Arc<dyn Repository>`, so tests substitute an in-memory implementation.
///
/// Ownership and role checks are the handlers' job; the repository executes exactly
/// what it is asked to.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow>;
    // Partial update; `None` fields keep their current value.
    async fn update_user_profile(
        &self,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> StoreResult<Option<UserRow>>;
    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;
    async fn list_users(&self) -> StoreResult<Vec<UserRow>>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<UserRow>>;
    async fn get_stats(&self) -> StoreResult<AdminStats>;

    // --- Listings ---
    // Returns up to `limit` matches starting at `offset`, plus the total match count.
    async fn search_properties(
        &self,
        filter: &PropertyQuery,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Property>, i64)>;
    async fn find_property(&self, id: Uuid) -> StoreResult<Option<Property>>;
    async fn list_owner_properties(&self, owner_id: Uuid) -> StoreResult<Vec<Property>>;
    // Inserts the listing, its features and the initial price-history entry atomically.
    async fn create_property(
        &self,
        owner_id: Uuid,
        req: CreatePropertyRequest,
    ) -> StoreResult<Property>;
    // Appends a price-history entry when the price changes.
    async fn update_property(
        &self,
        id: Uuid,
        req: UpdatePropertyRequest,
    ) -> StoreResult<Option<Property>>;
    async fn delete_property(&self, id: Uuid) -> StoreResult<bool>;
    async fn price_history(&self, property_id: Uuid) -> StoreResult<Vec<PriceChange>>;

    // --- Media & features ---
    async fn list_images(&self, property_id: Uuid) -> StoreResult<Vec<PropertyImage>>;
    // A new primary image demotes every other image of the listing.
    async fn add_image(&self, property_id: Uuid, req: AddImageRequest)
    -> StoreResult<PropertyImage>;
    async fn delete_image(&self, property_id: Uuid, image_id: Uuid) -> StoreResult<bool>;
    async fn list_features(&self, property_id: Uuid) -> StoreResult<Vec<PropertyFeature>>;
    async fn add_feature(&self, property_id: Uuid, name: &str) -> StoreResult<PropertyFeature>;
    async fn delete_feature(&self, property_id: Uuid, feature_id: Uuid) -> StoreResult<bool>;

    // --- Saved properties ---
    async fn list_saved_properties(&self, user_id: Uuid) -> StoreResult<Vec<SavedProperty>>;
    // Idempotent: true only if a new row was inserted.
    async fn save_property(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        notes: Option<String>,
    ) -> StoreResult<bool>;
    async fn unsave_property(&self, user_id: Uuid, property_id: Uuid) -> StoreResult<bool>;

    // --- Saved searches (always scoped to their owner) ---
    async fn list_saved_searches(&self, user_id: Uuid) -> StoreResult<Vec<SavedSearch>>;
    async fn create_saved_search(
        &self,
        user_id: Uuid,
        req: CreateSavedSearchRequest,
    ) -> StoreResult<SavedSearch>;
    async fn update_saved_search(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateSavedSearchRequest,
    ) -> StoreResult<Option<SavedSearch>>;
    async fn delete_saved_search(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // --- Notification preferences ---
    // Creates the default row on first access.
    async fn get_or_create_preferences(&self, user_id: Uuid)
    -> StoreResult<NotificationPreferences>;
    async fn update_preferences(
        &self,
        user_id: Uuid,
        req: UpdatePreferencesRequest,
    ) -> StoreResult<NotificationPreferences>;
}

/// RepositoryState
///
/// The type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const USER_COLUMNS: &str =
    "id, email, password_hash, first_name, last_name, phone, role, created_at, updated_at";

const PROPERTY_COLUMNS: &str = "id, owner_id, title, description, property_type, listing_type, \
     status, price, address, city, state, zip_code, bedrooms, bathrooms, square_feet, \
     year_built, latitude, longitude, created_at, updated_at";

const SAVED_SEARCH_COLUMNS: &str =
    "id, user_id, name, criteria, email_alerts, created_at, updated_at";

const PREFERENCE_COLUMNS: &str = "user_id, email_new_listings, email_price_changes, \
     email_saved_searches, push_enabled, frequency, updated_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clause shared by the listing query and its count query.
/// Values are always bound, never interpolated.
fn push_property_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &PropertyQuery) {
    builder.push(" WHERE status = ");
    builder.push_bind(filter.status.clone().unwrap_or_else(|| "active".to_string()));

    if let Some(city) = &filter.city {
        builder.push(" AND LOWER(city) = LOWER(");
        builder.push_bind(city.clone());
        builder.push(")");
    }
    if let Some(property_type) = &filter.property_type {
        builder.push(" AND property_type = ");
        builder.push_bind(property_type.clone());
    }
    if let Some(listing_type) = &filter.listing_type {
        builder.push(" AND listing_type = ");
        builder.push_bind(listing_type.clone());
    }
    if let Some(min) = filter.min_price {
        builder.push(" AND price >= ");
        builder.push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND price <= ");
        builder.push_bind(max);
    }
    if let Some(bedrooms) = filter.bedrooms {
        builder.push(" AND bedrooms >= ");
        builder.push_bind(bedrooms);
    }
    if let Some(bathrooms) = filter.bathrooms {
        builder.push(" AND bathrooms >= ");
        builder.push_bind(bathrooms);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder.push(" AND (title ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR description ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" ESCAPE '\\' OR address ILIKE ");
        builder.push_bind(pattern);
        builder.push(" ESCAPE '\\')");
    }
}

/// Escapes LIKE metacharacters so user text only ever matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        Ok(sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.phone)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        req: UpdateProfileRequest,
    ) -> StoreResult<Option<UserRow>> {
        let sql = format!(
            "UPDATE users SET email = COALESCE($2, email), first_name = COALESCE($3, first_name), \
             last_name = COALESCE($4, last_name), phone = COALESCE($5, phone), updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(req.email)
            .bind(req.first_name)
            .bind(req.last_name)
            .bind(req.phone)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_user_role(&self, id: Uuid, role: Role) -> StoreResult<Option<UserRow>> {
        let sql = format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Compiles every dashboard counter in a single round trip.
    async fn get_stats(&self) -> StoreResult<AdminStats> {
        let (total_users, total_properties, active_properties, total_saved_properties): (
            i64,
            i64,
            i64,
            i64,
        ) = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM users), \
                (SELECT COUNT(*) FROM properties), \
                (SELECT COUNT(*) FROM properties WHERE status = 'active'), \
                (SELECT COUNT(*) FROM saved_properties)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminStats {
            total_users,
            total_properties,
            active_properties,
            total_saved_properties,
        })
    }

    /// search_properties
    ///
    /// Filtered, paginated listing search. The WHERE clause is assembled with
    /// `QueryBuilder` so every user-supplied value is a bound parameter.
    async fn search_properties(
        &self,
        filter: &PropertyQuery,
        limit: i64,
        offset: i64,
    ) -> StoreResult<(Vec<Property>, i64)> {
        let mut count_query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM properties");
        push_property_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {PROPERTY_COLUMNS} FROM properties"));
        push_property_filters(&mut query, filter);
        query.push(" ORDER BY created_at DESC LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        let properties = query
            .build_query_as::<Property>()
            .fetch_all(&self.pool)
            .await?;

        Ok((properties, total))
    }

    async fn find_property(&self, id: Uuid) -> StoreResult<Option<Property>> {
        let sql = format!("SELECT {PROPERTY_COLUMNS} FROM properties WHERE id = $1");
        Ok(sqlx::query_as::<_, Property>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_owner_properties(&self, owner_id: Uuid) -> StoreResult<Vec<Property>> {
        let sql = format!(
            "SELECT {PROPERTY_COLUMNS} FROM properties WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Property>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_property(
        &self,
        owner_id: Uuid,
        req: CreatePropertyRequest,
    ) -> StoreResult<Property> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO properties (id, owner_id, title, description, property_type, listing_type, status, \
             price, address, city, state, zip_code, bedrooms, bathrooms, square_feet, year_built, \
             latitude, longitude, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, 'active', $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, NOW(), NOW()) \
             RETURNING {PROPERTY_COLUMNS}"
        );
        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(Uuid::new_v4())
            .bind(owner_id)
            .bind(req.title)
            .bind(req.description)
            .bind(req.property_type)
            .bind(req.listing_type)
            .bind(req.price)
            .bind(req.address)
            .bind(req.city)
            .bind(req.state)
            .bind(req.zip_code)
            .bind(req.bedrooms)
            .bind(req.bathrooms)
            .bind(req.square_feet)
            .bind(req.year_built)
            .bind(req.latitude)
            .bind(req.longitude)
            .fetch_one(&mut *tx)
            .await?;

        for name in req.features.unwrap_or_default() {
            sqlx::query(
                "INSERT INTO property_features (id, property_id, name) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(property.id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO price_history (id, property_id, price, previous_price, changed_at) \
             VALUES ($1, $2, $3, NULL, NOW())",
        )
        .bind(Uuid::new_v4())
        .bind(property.id)
        .bind(property.price)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(property)
    }

    /// update_property
    ///
    /// COALESCE-based partial update. The previous price is read under `FOR UPDATE`
    /// so the history entry and the new price are written in one transaction.
    async fn update_property(
        &self,
        id: Uuid,
        req: UpdatePropertyRequest,
    ) -> StoreResult<Option<Property>> {
        let mut tx = self.pool.begin().await?;

        let previous_price: Option<f64> =
            sqlx::query_scalar("SELECT price FROM properties WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous_price) = previous_price else {
            return Ok(None);
        };

        let sql = format!(
            "UPDATE properties SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                property_type = COALESCE($4, property_type), \
                listing_type = COALESCE($5, listing_type), \
                status = COALESCE($6, status), \
                price = COALESCE($7, price), \
                address = COALESCE($8, address), \
                city = COALESCE($9, city), \
                state = COALESCE($10, state), \
                zip_code = COALESCE($11, zip_code), \
                bedrooms = COALESCE($12, bedrooms), \
                bathrooms = COALESCE($13, bathrooms), \
                square_feet = COALESCE($14, square_feet), \
                year_built = COALESCE($15, year_built), \
                latitude = COALESCE($16, latitude), \
                longitude = COALESCE($17, longitude), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {PROPERTY_COLUMNS}"
        );
        let property = sqlx::query_as::<_, Property>(&sql)
            .bind(id)
            .bind(req.title)
            .bind(req.description)
            .bind(req.property_type)
            .bind(req.listing_type)
            .bind(req.status)
            .bind(req.price)
            .bind(req.address)
            .bind(req.city)
            .bind(req.state)
            .bind(req.zip_code)
            .bind(req.bedrooms)
            .bind(req.bathrooms)
            .bind(req.square_feet)
            .bind(req.year_built)
            .bind(req.latitude)
            .bind(req.longitude)
            .fetch_one(&mut *tx)
            .await?;

        if property.price != previous_price {
            sqlx::query(
                "INSERT INTO price_history (id, property_id, price, previous_price, changed_at) \
                 VALUES ($1, $2, $3, $4, NOW())",
            )
            .bind(Uuid::new_v4())
            .bind(id)
            .bind(property.price)
            .bind(previous_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(property))
    }

    async fn delete_property(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn price_history(&self, property_id: Uuid) -> StoreResult<Vec<PriceChange>> {
        Ok(sqlx::query_as::<_, PriceChange>(
            "SELECT id, property_id, price, previous_price, changed_at FROM price_history \
             WHERE property_id = $1 ORDER BY changed_at DESC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_images(&self, property_id: Uuid) -> StoreResult<Vec<PropertyImage>> {
        Ok(sqlx::query_as::<_, PropertyImage>(
            "SELECT id, property_id, url, caption, is_primary, sort_order, created_at \
             FROM property_images WHERE property_id = $1 ORDER BY sort_order ASC, created_at ASC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_image(
        &self,
        property_id: Uuid,
        req: AddImageRequest,
    ) -> StoreResult<PropertyImage> {
        let mut tx = self.pool.begin().await?;

        if req.is_primary {
            sqlx::query("UPDATE property_images SET is_primary = false WHERE property_id = $1")
                .bind(property_id)
                .execute(&mut *tx)
                .await?;
        }

        let image = sqlx::query_as::<_, PropertyImage>(
            "INSERT INTO property_images (id, property_id, url, caption, is_primary, sort_order, created_at) \
             VALUES ($1, $2, $3, $4, $5, \
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM property_images WHERE property_id = $2), NOW()) \
             RETURNING id, property_id, url, caption, is_primary, sort_order, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(property_id)
        .bind(req.url)
        .bind(req.caption)
        .bind(req.is_primary)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(image)
    }

    async fn delete_image(&self, property_id: Uuid, image_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM property_images WHERE id = $1 AND property_id = $2")
            .bind(image_id)
            .bind(property_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_features(&self, property_id: Uuid) -> StoreResult<Vec<PropertyFeature>> {
        Ok(sqlx::query_as::<_, PropertyFeature>(
            "SELECT id, property_id, name FROM property_features WHERE property_id = $1 ORDER BY name ASC",
        )
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_feature(&self, property_id: Uuid, name: &str) -> StoreResult<PropertyFeature> {
        Ok(sqlx::query_as::<_, PropertyFeature>(
            "INSERT INTO property_features (id, property_id, name) VALUES ($1, $2, $3) \
             RETURNING id, property_id, name",
        )
        .bind(Uuid::new_v4())
        .bind(property_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn delete_feature(&self, property_id: Uuid, feature_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM property_features WHERE id = $1 AND property_id = $2")
                .bind(feature_id)
                .bind(property_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_saved_properties(&self, user_id: Uuid) -> StoreResult<Vec<SavedProperty>> {
        Ok(sqlx::query_as::<_, SavedProperty>(
            "SELECT p.id, p.owner_id, p.title, p.description, p.property_type, p.listing_type, \
                    p.status, p.price, p.address, p.city, p.state, p.zip_code, p.bedrooms, \
                    p.bathrooms, p.square_feet, p.year_built, p.latitude, p.longitude, \
                    p.created_at, p.updated_at, s.notes, s.created_at AS saved_at \
             FROM saved_properties s \
             JOIN properties p ON p.id = s.property_id \
             WHERE s.user_id = $1 \
             ORDER BY s.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// Uses `ON CONFLICT DO NOTHING` on the (user_id, property_id) key, so saving twice
    /// is reported as `false` rather than as an integrity failure.
    async fn save_property(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        notes: Option<String>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO saved_properties (user_id, property_id, notes, created_at) \
             VALUES ($1, $2, $3, NOW()) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(property_id)
        .bind(notes)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unsave_property(&self, user_id: Uuid, property_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM saved_properties WHERE user_id = $1 AND property_id = $2")
                .bind(user_id)
                .bind(property_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_saved_searches(&self, user_id: Uuid) -> StoreResult<Vec<SavedSearch>> {
        let sql = format!(
            "SELECT {SAVED_SEARCH_COLUMNS} FROM saved_searches WHERE user_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, SavedSearch>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_saved_search(
        &self,
        user_id: Uuid,
        req: CreateSavedSearchRequest,
    ) -> StoreResult<SavedSearch> {
        let sql = format!(
            "INSERT INTO saved_searches (id, user_id, name, criteria, email_alerts, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, NOW(), NOW()) RETURNING {SAVED_SEARCH_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, SavedSearch>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(req.name)
            .bind(req.criteria)
            .bind(req.email_alerts)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_saved_search(
        &self,
        id: Uuid,
        user_id: Uuid,
        req: UpdateSavedSearchRequest,
    ) -> StoreResult<Option<SavedSearch>> {
        let sql = format!(
            "UPDATE saved_searches SET name = COALESCE($3, name), criteria = COALESCE($4, criteria), \
             email_alerts = COALESCE($5, email_alerts), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING {SAVED_SEARCH_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, SavedSearch>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(req.name)
            .bind(req.criteria)
            .bind(req.email_alerts)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_saved_search(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM saved_searches WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_or_create_preferences(
        &self,
        user_id: Uuid,
    ) -> StoreResult<NotificationPreferences> {
        let defaults = NotificationPreferences::defaults_for(user_id);
        sqlx::query(
            "INSERT INTO notification_preferences (user_id, email_new_listings, email_price_changes, \
             email_saved_searches, push_enabled, frequency, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NOW()) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(defaults.user_id)
        .bind(defaults.email_new_listings)
        .bind(defaults.email_price_changes)
        .bind(defaults.email_saved_searches)
        .bind(defaults.push_enabled)
        .bind(defaults.frequency)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {PREFERENCE_COLUMNS} FROM notification_preferences WHERE user_id = $1");
        Ok(sqlx::query_as::<_, NotificationPreferences>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        req: UpdatePreferencesRequest,
    ) -> StoreResult<NotificationPreferences> {
        // Guarantees the row exists before the partial update.
        self.get_or_create_preferences(user_id).await?;

        let sql = format!(
            "UPDATE notification_preferences SET \
                email_new_listings = COALESCE($2, email_new_listings), \
                email_price_changes = COALESCE($3, email_price_changes), \
                email_saved_searches = COALESCE($4, email_saved_searches), \
                push_enabled = COALESCE($5, push_enabled), \
                frequency = COALESCE($6, frequency), \
                updated_at = NOW() \
             WHERE user_id = $1 RETURNING {PREFERENCE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, NotificationPreferences>(&sql)
            .bind(user_id)
            .bind(req.email_new_listings)
            .bind(req.email_price_changes)
            .bind(req.email_saved_searches)
            .bind(req.push_enabled)
            .bind(req.frequency)
            .fetch_one(&self.pool)
            .await?)
    }
}
