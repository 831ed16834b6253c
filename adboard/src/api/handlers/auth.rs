use axum::{Json, extract::State};

use crate::{
    AppState,
    api::models::{
        MessageResponse,
        auth::{LoginRequest, RegisterRequest, ResetPasswordRequest, TokenResponse},
        users::CurrentUser,
    },
    auth::{password, session},
    db::{handlers::Users, models::users::UserCreateDBRequest},
    errors::Error,
};

/// Pull a required field out of a request, rejecting absent or blank values
/// with a 400 rather than a generic deserialization error.
pub(crate) fn require_field(value: Option<String>, name: &str) -> Result<String, Error> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::BadRequest {
            message: format!("Missing required field: {name}"),
        }),
    }
}

/// Check a new password against the configured length bounds.
pub(crate) fn validate_password(password: &str, state: &AppState) -> Result<(), Error> {
    let password_config = &state.config.auth.password;
    if password.len() < password_config.min_length {
        return Err(Error::BadRequest {
            message: format!("Password must be at least {} characters", password_config.min_length),
        });
    }
    if password.len() > password_config.max_length {
        return Err(Error::BadRequest {
            message: format!("Password must be no more than {} characters", password_config.max_length),
        });
    }
    Ok(())
}

/// Hash a password on a blocking thread to avoid stalling the async runtime.
pub(crate) async fn hash_password_blocking(password: String) -> Result<String, Error> {
    tokio::task::spawn_blocking(move || password::hash_password(&password))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password hashing task: {e}"),
        })?
}

/// Verify a password on a blocking thread to avoid stalling the async runtime.
pub(crate) async fn verify_password_blocking(password: String, hash: String) -> Result<bool, Error> {
    tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })?
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    tag = "auth",
    responses(
        (status = 200, description = "User registered successfully", body = MessageResponse),
        (status = 400, description = "Missing fields or username/email already taken"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn register(State(state): State<AppState>, Json(request): Json<RegisterRequest>) -> Result<Json<MessageResponse>, Error> {
    let username = require_field(request.username, "username")?;
    let email = require_field(request.email, "email")?;
    let password = require_field(request.password, "password")?;

    validate_password(&password, &state)?;

    let password_hash = hash_password_blocking(password).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    // A duplicate username or email surfaces as a unique violation, which
    // the error layer translates into the conflict message
    user_repo
        .create(&UserCreateDBRequest {
            username,
            email,
            password_hash,
            first_name: request.first_name,
            last_name: request.last_name,
            phone: request.phone,
        })
        .await?;

    Ok(Json(MessageResponse::new("User registered successfully")))
}

/// Login with username or email
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Unknown login or wrong password"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> Result<Json<TokenResponse>, Error> {
    let login = require_field(request.login, "login")?;
    let password = require_field(request.password, "password")?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    // The login identifier matches against username OR email
    let user = user_repo.get_by_login(&login).await?.ok_or_else(|| Error::InvalidCredentials {
        message: "User not found".to_string(),
    })?;

    let is_valid = verify_password_blocking(password, user.password_hash.clone()).await?;
    if !is_valid {
        return Err(Error::InvalidCredentials {
            message: "Invalid password".to_string(),
        });
    }

    let current_user = CurrentUser::from(user);
    let token = session::create_session_token(&current_user, &state.config)?;

    Ok(Json(TokenResponse { token }))
}

/// Reset a password by email
#[utoipa::path(
    post,
    path = "/auth/reset-password",
    request_body = ResetPasswordRequest,
    tag = "auth",
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Unknown email"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, Error> {
    let email = require_field(request.email, "email")?;
    let new_password = require_field(request.new_password, "new_password")?;

    validate_password(&new_password, &state)?;

    let password_hash = hash_password_blocking(new_password).await?;

    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let found = user_repo.update_password_by_email(&email, &password_hash).await?;
    if !found {
        return Err(Error::BadRequest {
            message: "No user with that email address".to_string(),
        });
    }

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

#[cfg(test)]
mod tests {
    use crate::auth::session;
    use crate::test_utils::{create_test_app, create_test_config, register_user};
    use serde_json::json;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_register_then_login_roundtrip(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server
            .post("/auth/register")
            .json(&json!({
                "username": "alice",
                "email": "a@x.com",
                "password": "password-1",
            }))
            .await;
        response.assert_status_ok();

        let response = server
            .post("/auth/login")
            .json(&json!({ "login": "alice", "password": "password-1" }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        let token = body["token"].as_str().unwrap();

        // The token binds the registered identity
        let user = session::verify_session_token(token, &create_test_config()).unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");
    }

    #[sqlx::test]
    async fn test_login_works_with_email_too(pool: PgPool) {
        let server = create_test_app(pool).await;
        register_user(&server, "bob", "bob@example.com", "password-1").await;

        let response = server
            .post("/auth/login")
            .json(&json!({ "login": "bob@example.com", "password": "password-1" }))
            .await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_register_duplicate_email_and_username(pool: PgPool) {
        let server = create_test_app(pool).await;
        register_user(&server, "carol", "carol@example.com", "password-1").await;

        // Same email, different username
        let response = server
            .post("/auth/register")
            .json(&json!({ "username": "carol2", "email": "carol@example.com", "password": "password-1" }))
            .await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "An account with this email address already exists");

        // Different email, same username
        let response = server
            .post("/auth/register")
            .json(&json!({ "username": "carol", "email": "carol2@example.com", "password": "password-1" }))
            .await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "This username is already taken");
    }

    #[sqlx::test]
    async fn test_register_missing_fields(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server
            .post("/auth/register")
            .json(&json!({ "username": "dave", "password": "password-1" }))
            .await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Missing required field: email");
    }

    #[sqlx::test]
    async fn test_register_rejects_short_password(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server
            .post("/auth/register")
            .json(&json!({ "username": "eve", "email": "eve@example.com", "password": "short" }))
            .await;
        response.assert_status_bad_request();
    }

    #[sqlx::test]
    async fn test_login_failures(pool: PgPool) {
        let server = create_test_app(pool).await;
        register_user(&server, "frank", "frank@example.com", "password-1").await;

        let response = server
            .post("/auth/login")
            .json(&json!({ "login": "frank", "password": "wrong-password" }))
            .await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Invalid password");

        let response = server
            .post("/auth/login")
            .json(&json!({ "login": "nobody", "password": "password-1" }))
            .await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "User not found");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_reset_password_flow(pool: PgPool) {
        let server = create_test_app(pool).await;
        register_user(&server, "grace", "grace@example.com", "password-1").await;

        let response = server
            .post("/auth/reset-password")
            .json(&json!({ "email": "grace@example.com", "new_password": "password-2" }))
            .await;
        response.assert_status_ok();

        // Old password no longer works
        let response = server
            .post("/auth/login")
            .json(&json!({ "login": "grace", "password": "password-1" }))
            .await;
        response.assert_status_bad_request();

        // New one does
        let response = server
            .post("/auth/login")
            .json(&json!({ "login": "grace", "password": "password-2" }))
            .await;
        response.assert_status_ok();
    }

    #[sqlx::test]
    async fn test_reset_password_unknown_email(pool: PgPool) {
        let server = create_test_app(pool).await;

        let response = server
            .post("/auth/reset-password")
            .json(&json!({ "email": "ghost@example.com", "new_password": "password-2" }))
            .await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "No user with that email address");
    }
}
