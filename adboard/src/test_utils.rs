//! Shared constructors for integration tests.

use crate::config::{Config, UploadConfig};
use crate::db::handlers::{Users, photo_storage};
use crate::db::models::users::{UserCreateDBRequest, UserDBResponse};
use axum_test::TestServer;
use serde_json::json;
use sqlx::PgPool;

pub fn create_test_config() -> Config {
    // Use a temp directory for uploaded photos
    let temp_dir = std::env::temp_dir().join(format!("adboard-test-uploads-{}", std::process::id()));

    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: None,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        uploads: UploadConfig {
            dir: temp_dir,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub async fn create_test_app_state(pool: PgPool) -> crate::AppState {
    let config = create_test_config();
    let photo_storage = photo_storage::create_photo_storage(&config.uploads)
        .await
        .expect("Failed to create test photo storage");

    crate::AppState::builder().db(pool).config(config).photo_storage(photo_storage).build()
}

pub async fn create_test_app(pool: PgPool) -> TestServer {
    let app = crate::Application::new_with_pool(create_test_config(), Some(pool))
        .await
        .expect("Failed to create application");

    app.into_test_server()
}

/// Insert a user directly, bypassing the HTTP layer. The stored hash is not a
/// real one, so this user cannot log in - use [`register_and_login`] where a
/// session is needed.
pub async fn seed_user(pool: &PgPool, username: &str) -> UserDBResponse {
    let mut conn = pool.acquire().await.expect("Failed to acquire connection");
    let mut users_repo = Users::new(&mut conn);

    users_repo
        .create(&UserCreateDBRequest {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "$argon2id$test-only-hash".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
        })
        .await
        .expect("Failed to create test user")
}

pub async fn register_user(server: &TestServer, username: &str, email: &str, password: &str) {
    let response = server
        .post("/auth/register")
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
        }))
        .await;
    response.assert_status_ok();
}

pub async fn register_and_login(server: &TestServer, username: &str, email: &str, password: &str) -> String {
    register_user(server, username, email, password).await;

    let response = server
        .post("/auth/login")
        .json(&json!({ "login": username, "password": password }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["token"].as_str().expect("login response carries a token").to_string()
}
