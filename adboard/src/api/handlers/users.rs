use axum::{Json, extract::State};

use crate::{
    AppState,
    api::handlers::auth::{hash_password_blocking, verify_password_blocking},
    api::models::{
        MessageResponse,
        users::{CurrentUser, ProfileResponse, ProfileUpdateRequest},
    },
    db::{
        errors::DbError,
        handlers::Users,
        models::users::UserUpdateDBRequest,
    },
    errors::Error,
    types::abbrev_uuid,
};

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "users",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "The caller's profile", body = ProfileResponse),
        (status = 401, description = "Missing token"),
        (status = 404, description = "User no longer exists"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn get_profile(State(state): State<AppState>, current_user: CurrentUser) -> Result<Json<ProfileResponse>, Error> {
    let mut conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut conn);

    let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
        resource: "User".to_string(),
        id: current_user.id.to_string(),
    })?;

    Ok(Json(ProfileResponse::from(user)))
}

/// Update the authenticated user's profile
///
/// Username and email are updated when supplied. Changing the password
/// requires both the current and the new password.
#[utoipa::path(
    put,
    path = "/users/profile",
    request_body = ProfileUpdateRequest,
    tag = "users",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Profile updated", body = MessageResponse),
        (status = 400, description = "Wrong current password or conflicting username/email"),
        (status = 401, description = "Missing token"),
    )
)]
#[tracing::instrument(skip_all, fields(user_id = %abbrev_uuid(&current_user.id)))]
pub async fn update_profile(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<MessageResponse>, Error> {
    // One transaction covers the password check and both updates, so a
    // failure partway through changes nothing
    let mut tx = state.db.begin().await.map_err(|e| Error::Database(e.into()))?;
    let mut user_repo = Users::new(&mut tx);

    let mut update = UserUpdateDBRequest {
        username: request.username,
        email: request.email,
        password_hash: None,
    };

    match (request.password, request.new_password) {
        (Some(current), Some(new)) => {
            super::auth::validate_password(&new, &state)?;

            let user = user_repo.get_by_id(current_user.id).await?.ok_or_else(|| Error::NotFound {
                resource: "User".to_string(),
                id: current_user.id.to_string(),
            })?;

            let is_valid = verify_password_blocking(current, user.password_hash).await?;
            if !is_valid {
                return Err(Error::BadRequest {
                    message: "Current password is incorrect".to_string(),
                });
            }

            update.password_hash = Some(hash_password_blocking(new).await?);
        }
        (None, None) => {}
        _ => {
            return Err(Error::BadRequest {
                message: "Both password and new_password are required to change the password".to_string(),
            });
        }
    }

    if update.username.is_some() || update.email.is_some() || update.password_hash.is_some() {
        user_repo.update(current_user.id, &update).await.map_err(|e| match e {
            DbError::NotFound => Error::NotFound {
                resource: "User".to_string(),
                id: current_user.id.to_string(),
            },
            other => Error::Database(other),
        })?;
    }

    tx.commit().await.map_err(|e| Error::Database(e.into()))?;

    Ok(Json(MessageResponse::new("Profile updated successfully")))
}
