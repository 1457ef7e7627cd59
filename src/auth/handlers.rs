use axum::{
    extract::{FromRef, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mongodb::bson::DateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, RegisterRequest,
            ResetPasswordRequest,
        },
        jwt::{JwtKeys, PendingUser},
        password::{generate_reset_token, hash_password, hash_reset_token, verify_password},
    },
    state::AppState,
    users::{dto::PublicUser, repo::is_duplicate_key, repo_types::User},
    validate,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/activate/:token", get(activate))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password/:token", post(reset_password))
}

/// Validate the registration payload and mail an activation link. The
/// account document is only written once the link is exchanged.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    validate::validate_username(&payload.username).map_err(bad_request)?;
    validate::validate_email(&payload.email).map_err(bad_request)?;
    validate::validate_password(&payload.password).map_err(bad_request)?;
    validate::validate_name(&payload.first_name).map_err(bad_request)?;
    validate::validate_name(&payload.last_name).map_err(bad_request)?;
    validate::validate_phone(&payload.phone_no).map_err(bad_request)?;

    if User::find_by_email(&state.users, &payload.email)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }
    if User::find_by_username(&state.users, &payload.username)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(username = %payload.username, "username already taken");
        return Err((StatusCode::CONFLICT, "Username already taken".into()));
    }

    // Hash before signing, so the emailed token never carries the plaintext.
    let password_hash = hash_password(&payload.password).map_err(internal)?;

    let keys = JwtKeys::from_ref(&state);
    let activation_token = keys
        .sign_activation(PendingUser {
            username: payload.username.clone(),
            email: payload.email.clone(),
            password_hash,
            first_name: payload.first_name.clone(),
            last_name: payload.last_name.clone(),
            phone_no: payload.phone_no.clone(),
        })
        .map_err(internal)?;

    let activation_url = format!(
        "{}/api/v1/auth/activate/{}",
        state.config.public_url, activation_token
    );
    let body = format!(
        "Hello {}, please click on the link to activate your account: {}",
        payload.first_name, activation_url
    );
    if let Err(e) = state
        .mailer
        .send_mail(&payload.email, "Activate your account", &body)
        .await
    {
        error!(error = %e, email = %payload.email, "activation email failed");
        return Err((
            StatusCode::BAD_GATEWAY,
            "Failed to send activation email".into(),
        ));
    }

    info!(email = %payload.email, "registration accepted, activation email sent");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            success: true,
            message: format!(
                "please check your email: {} to activate your account",
                payload.email
            ),
        }),
    ))
}

/// Exchange an activation token for a persisted account and a session.
#[instrument(skip(state, token))]
pub async fn activate(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_activation(&token).map_err(|_| {
        warn!("invalid or expired activation token");
        (
            StatusCode::UNAUTHORIZED,
            "Invalid or expired activation token".to_string(),
        )
    })?;

    if User::find_by_email(&state.users, &claims.email)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err((StatusCode::CONFLICT, "User already exists".into()));
    }

    let mut user = User::new(
        claims.username,
        claims.email,
        claims.password_hash,
        claims.first_name,
        claims.last_name,
        claims.phone_no,
    );
    // The unique indexes are the backstop for concurrent activations.
    let id = match User::insert(&state.users, &user).await {
        Ok(id) => id,
        Err(e) if is_duplicate_key(&e) => {
            return Err((StatusCode::CONFLICT, "User already exists".into()))
        }
        Err(e) => return Err(internal(e)),
    };
    user.id = Some(id);

    let session = keys.sign_session(id).map_err(internal)?;
    info!(user_id = %id, email = %user.email, "account activated");
    session_response(StatusCode::CREATED, &user, session, keys.session_ttl_secs())
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Response, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Please provide all fields".into()));
    }
    validate::validate_email(&payload.email).map_err(bad_request)?;

    let user = match User::find_by_email(&state.users, &payload.email)
        .await
        .map_err(internal)?
    {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(internal)?;
    if !ok {
        warn!(email = %payload.email, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let id = user.id.ok_or_else(missing_id)?;
    let keys = JwtKeys::from_ref(&state);
    let session = keys.sign_session(id).map_err(internal)?;

    info!(user_id = %id, email = %user.email, "user logged in");
    session_response(StatusCode::OK, &user, session, keys.session_ttl_secs())
}

/// Sessions are stateless; logout just expires the cookie.
#[instrument]
pub async fn logout() -> Result<Response, (StatusCode, String)> {
    let cookie = HeaderValue::from_str(&clear_session_cookie())
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((
        StatusCode::OK,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(MessageResponse {
            success: true,
            message: "Log out successful".into(),
        }),
    )
        .into_response())
}

/// Store a hashed reset token and mail the raw one. The reply is the same
/// whether or not the address is registered.
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();
    validate::validate_email(&payload.email).map_err(bad_request)?;

    let reply = Json(MessageResponse {
        success: true,
        message: "If that email is registered, a reset link has been sent".into(),
    });

    let Some(user) = User::find_by_email(&state.users, &payload.email)
        .await
        .map_err(internal)?
    else {
        return Ok(reply);
    };
    let Some(id) = user.id else {
        return Ok(reply);
    };

    let token = generate_reset_token();
    let expires = DateTime::from_millis(
        DateTime::now().timestamp_millis() + state.config.jwt.reset_ttl_minutes * 60 * 1000,
    );
    User::set_reset_token(&state.users, id, &hash_reset_token(&token), expires)
        .await
        .map_err(internal)?;

    let reset_url = format!(
        "{}/api/v1/auth/reset-password/{}",
        state.config.public_url, token
    );
    let body = format!(
        "Hello {}, a password reset was requested for your account. Follow this link to set a new password: {}",
        user.first_name, reset_url
    );
    if let Err(e) = state
        .mailer
        .send_mail(&user.email, "Reset your password", &body)
        .await
    {
        // Reply stays generic so a delivery failure cannot reveal the account.
        error!(error = %e, user_id = %id, "reset email failed");
    } else {
        info!(user_id = %id, "reset email sent");
    }

    Ok(reply)
}

/// Complete a reset: the raw token from the link is hashed and matched
/// against the stored digest, which must not have expired.
#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    validate::validate_password(&payload.password).map_err(bad_request)?;

    let user = User::find_by_reset_token(&state.users, &hash_reset_token(&token))
        .await
        .map_err(internal)?
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Invalid or expired reset token".to_string(),
        ))?;
    let id = user.id.ok_or_else(missing_id)?;

    let hash = hash_password(&payload.password).map_err(internal)?;
    User::set_password(&state.users, id, &hash)
        .await
        .map_err(internal)?;

    info!(user_id = %id, "password reset completed");
    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated successfully".into(),
    }))
}

fn session_response(
    status: StatusCode,
    user: &User,
    token: String,
    max_age: i64,
) -> Result<Response, (StatusCode, String)> {
    let cookie = HeaderValue::from_str(&session_cookie(&token, max_age))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((
        status,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(AuthResponse {
            success: true,
            user: PublicUser::from(user),
            token,
        }),
    )
        .into_response())
}

fn session_cookie(token: &str, max_age: i64) -> String {
    format!(
        "token={}; HttpOnly; Secure; SameSite=None; Path=/; Max-Age={}",
        token, max_age
    )
}

fn clear_session_cookie() -> String {
    "token=; HttpOnly; Secure; SameSite=None; Path=/; Max-Age=0".to_string()
}

fn bad_request(msg: &'static str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, msg.to_string())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn missing_id() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "stored user missing id".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_flags() {
        let cookie = session_cookie("tok123", 3600);
        assert!(cookie.starts_with("token=tok123;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie();
        assert!(cookie.starts_with("token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
