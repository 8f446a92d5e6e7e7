//! Postgres-backed repository tests. They need a disposable database:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

mod common;

use common::sample_listing;
use listing_portal::{
    auth::Role,
    models::{
        AddImageRequest, CreateSavedSearchRequest, NewUser, PropertyQuery,
        UpdatePreferencesRequest, UpdatePropertyRequest,
    },
    repository::{PostgresRepository, Repository, StoreError, escape_like},
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::raw_sql(include_str!("../migrations/0001_initial_schema.sql"))
            .execute(&pool)
            .await
            .expect("Failed to apply the schema.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

fn new_user(role: Role) -> NewUser {
    NewUser {
        email: format!("{}@test.example.com", Uuid::new_v4()),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
        first_name: None,
        last_name: None,
        phone: None,
        role,
    }
}

// --- Tests ---

#[tokio::test]
#[ignore]
async fn test_duplicate_email_is_integrity_failure() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let user = repo.create_user(new_user(Role::User)).await.unwrap();
    let mut duplicate = new_user(Role::User);
    duplicate.email = user.email.to_uppercase();

    let err = repo.create_user(duplicate).await.unwrap_err();
    assert!(matches!(err, StoreError::Integrity(_)));
}

#[tokio::test]
#[ignore]
async fn test_property_lifecycle_tracks_price_history() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo.create_user(new_user(Role::Agent)).await.unwrap();

    let property = repo
        .create_property(owner.id, sample_listing("Integration home", 300_000.0))
        .await
        .unwrap();
    assert_eq!(property.status, "active");
    assert_eq!(repo.list_features(property.id).await.unwrap().len(), 1);

    let updated = repo
        .update_property(
            property.id,
            UpdatePropertyRequest {
                price: Some(280_000.0),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.price, 280_000.0);
    assert_eq!(updated.title, "Integration home");

    let history = repo.price_history(property.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].previous_price, Some(300_000.0));

    // Same price again: no new entry.
    repo.update_property(
        property.id,
        UpdatePropertyRequest {
            price: Some(280_000.0),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(repo.price_history(property.id).await.unwrap().len(), 2);

    assert!(repo.delete_property(property.id).await.unwrap());
    assert!(repo.find_property(property.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_search_binds_filters() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo.create_user(new_user(Role::Agent)).await.unwrap();
    let marker = Uuid::new_v4().to_string();

    repo.create_property(owner.id, sample_listing(&format!("{marker} cheap"), 10.0))
        .await
        .unwrap();
    repo.create_property(owner.id, sample_listing(&format!("{marker} dear"), 10_000.0))
        .await
        .unwrap();

    let filter = PropertyQuery {
        search: Some(marker.clone()),
        max_price: Some(100.0),
        ..Default::default()
    };
    let (found, total) = repo.search_properties(&filter, 10, 0).await.unwrap();
    assert_eq!(total, 1);
    assert!(found[0].title.ends_with("cheap"));

    // A quote in the search text is data, not SQL.
    let filter = PropertyQuery {
        search: Some("' OR 1=1 --".into()),
        ..Default::default()
    };
    let (_, total) = repo.search_properties(&filter, 10, 0).await.unwrap();
    assert_eq!(total, 0);
}

#[test]
fn test_like_metacharacters_are_escaped() {
    assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    assert_eq!(escape_like(r"C:\path"), r"C:\\path");
    assert_eq!(escape_like("plain"), "plain");
}

#[tokio::test]
#[ignore]
async fn test_wildcards_in_filters_match_literally() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo.create_user(new_user(Role::Agent)).await.unwrap();
    let marker = Uuid::new_v4().simple().to_string();
    repo.create_property(owner.id, sample_listing(&format!("{marker} loft"), 1.0))
        .await
        .unwrap();

    let filter = PropertyQuery {
        city: Some("%".into()),
        ..Default::default()
    };
    let (_, total) = repo.search_properties(&filter, 10, 0).await.unwrap();
    assert_eq!(total, 0);

    let filter = PropertyQuery {
        search: Some(format!("{}%", &marker[..8])),
        ..Default::default()
    };
    let (_, total) = repo.search_properties(&filter, 10, 0).await.unwrap();
    assert_eq!(total, 0);

    let filter = PropertyQuery {
        search: Some(marker.clone()),
        city: Some("SPRINGFIELD".into()),
        ..Default::default()
    };
    let (_, total) = repo.search_properties(&filter, 10, 0).await.unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
#[ignore]
async fn test_primary_image_and_saved_items() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = repo.create_user(new_user(Role::Agent)).await.unwrap();
    let buyer = repo.create_user(new_user(Role::User)).await.unwrap();
    let property = repo
        .create_property(owner.id, sample_listing("Images", 1.0))
        .await
        .unwrap();

    for n in 0..2 {
        repo.add_image(
            property.id,
            AddImageRequest {
                url: format!("https://img.example.com/{n}.jpg"),
                caption: None,
                is_primary: true,
            },
        )
        .await
        .unwrap();
    }
    let images = repo.list_images(property.id).await.unwrap();
    assert_eq!(images.iter().filter(|i| i.is_primary).count(), 1);
    assert_eq!(images[1].sort_order, 1);

    assert!(repo.save_property(buyer.id, property.id, None).await.unwrap());
    assert!(!repo.save_property(buyer.id, property.id, None).await.unwrap());
    let saved = repo.list_saved_properties(buyer.id).await.unwrap();
    assert_eq!(saved[0].property.id, property.id);

    let search = repo
        .create_saved_search(
            buyer.id,
            CreateSavedSearchRequest {
                name: "Anything".into(),
                criteria: json!({ "city": "Springfield" }),
                email_alerts: true,
            },
        )
        .await
        .unwrap();
    assert!(!repo.delete_saved_search(search.id, owner.id).await.unwrap());
    assert!(repo.delete_saved_search(search.id, buyer.id).await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_preferences_are_created_once() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = repo.create_user(new_user(Role::User)).await.unwrap();

    let defaults = repo.get_or_create_preferences(user.id).await.unwrap();
    assert_eq!(defaults.frequency, "instant");

    let updated = repo
        .update_preferences(
            user.id,
            UpdatePreferencesRequest {
                frequency: Some("daily".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.frequency, "daily");
    assert!(updated.email_new_listings);

    let again = repo.get_or_create_preferences(user.id).await.unwrap();
    assert_eq!(again.frequency, "daily");
}
