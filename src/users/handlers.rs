use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use mongodb::bson::oid::ObjectId;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::MessageResponse,
        jwt::AuthUser,
        password::{hash_password, verify_password},
    },
    state::AppState,
    users::{
        dto::{ChangePasswordRequest, PublicUser, UpdateProfileRequest, UserResponse},
        repo::{is_duplicate_key, ProfileUpdate},
        repo_types::User,
    },
    validate,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(me).put(update_profile))
        .route("/me/password", put(change_password))
        .route("/users/:id", get(get_user))
}

/// Load the account behind the current session.
#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let user = User::find_by_id(&state.users, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

/// Update profile fields. The current password gates the change.
#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    validate::validate_email(&payload.email).map_err(bad_request)?;
    validate::validate_name(&payload.first_name).map_err(bad_request)?;
    validate::validate_name(&payload.last_name).map_err(bad_request)?;
    validate::validate_phone(&payload.phone_no).map_err(bad_request)?;

    let user = User::find_by_id(&state.users, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let ok = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user_id, "profile update with wrong password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let update = ProfileUpdate {
        email: payload.email,
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone_no: payload.phone_no,
    };
    let updated = match User::update_profile(&state.users, user_id, &update).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "User not found".into())),
        Err(e) if is_duplicate_key(&e) => {
            return Err((
                StatusCode::CONFLICT,
                "Email or phone number already in use".into(),
            ))
        }
        Err(e) => return Err(internal(e)),
    };

    info!(user_id = %user_id, "profile updated");
    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&updated),
    }))
}

/// Replace the password of the current account.
#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    validate::validate_password(&payload.new_password).map_err(bad_request)?;

    let user = User::find_by_id(&state.users, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let ok = verify_password(&payload.current_password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user_id, "password change with wrong password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let hash = hash_password(&payload.new_password).map_err(internal)?;
    User::set_password(&state.users, user_id, &hash)
        .await
        .map_err(internal)?;

    info!(user_id = %user_id, "password changed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated successfully".into(),
    }))
}

/// Fetch a user's public profile by id.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(_requester): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    let id = ObjectId::parse_str(&id)
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid user id".to_string()))?;

    let user = User::find_by_id(&state.users, id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "User not found".to_string()))?;

    Ok(Json(UserResponse {
        success: true,
        user: PublicUser::from(&user),
    }))
}

fn bad_request(msg: &'static str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
