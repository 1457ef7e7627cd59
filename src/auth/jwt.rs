use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{config::JwtConfig, state::AppState};

/// Claims carried by a session token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String, // user id, ObjectId hex
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

/// Pending-user fields signed into an activation token at registration.
/// The password arrives here already hashed; the plaintext never leaves
/// the registration request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ActivationClaims {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
}

/// Input for signing an activation token.
#[derive(Debug, Clone)]
pub struct PendingUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
}

/// Signing and verification keys for both token families. Session and
/// activation tokens use separate secrets, so one can never stand in for
/// the other.
#[derive(Clone)]
pub struct JwtKeys {
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    activation_encoding: EncodingKey,
    activation_decoding: DecodingKey,
    issuer: String,
    audience: String,
    session_ttl: Duration,
    activation_ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            activation_secret,
            issuer,
            audience,
            session_ttl_minutes,
            activation_ttl_minutes,
            ..
        } = state.config.jwt.clone();
        Self {
            session_encoding: EncodingKey::from_secret(secret.as_bytes()),
            session_decoding: DecodingKey::from_secret(secret.as_bytes()),
            activation_encoding: EncodingKey::from_secret(activation_secret.as_bytes()),
            activation_decoding: DecodingKey::from_secret(activation_secret.as_bytes()),
            issuer,
            audience,
            session_ttl: Duration::from_secs((session_ttl_minutes as u64) * 60),
            activation_ttl: Duration::from_secs((activation_ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn session_ttl_secs(&self) -> i64 {
        self.session_ttl.as_secs() as i64
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }

    pub fn sign_session(&self, user_id: ObjectId) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.session_ttl.as_secs() as i64);
        let claims = SessionClaims {
            sub: user_id.to_hex(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.session_encoding)?;
        debug!(user_id = %user_id, "session token signed");
        Ok(token)
    }

    pub fn verify_session(&self, token: &str) -> anyhow::Result<SessionClaims> {
        let data = decode::<SessionClaims>(token, &self.session_decoding, &self.validation())?;
        debug!(user_id = %data.claims.sub, "session token verified");
        Ok(data.claims)
    }

    pub fn sign_activation(&self, pending: PendingUser) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.activation_ttl.as_secs() as i64);
        let claims = ActivationClaims {
            username: pending.username,
            email: pending.email,
            password_hash: pending.password_hash,
            first_name: pending.first_name,
            last_name: pending.last_name,
            phone_no: pending.phone_no,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.activation_encoding)?;
        debug!(email = %claims.email, "activation token signed");
        Ok(token)
    }

    pub fn verify_activation(&self, token: &str) -> anyhow::Result<ActivationClaims> {
        let data =
            decode::<ActivationClaims>(token, &self.activation_decoding, &self.validation())?;
        debug!(email = %data.claims.email, "activation token verified");
        Ok(data.claims)
    }
}

/// Extracts the session and yields the user id. Accepts a Bearer header
/// first, the `token` cookie as fallback.
pub struct AuthUser(pub ObjectId);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or((StatusCode::UNAUTHORIZED, "Missing session token".to_string()))?;

        let claims = match keys.verify_session(&token) {
            Ok(c) => c,
            Err(_) => {
                warn!("invalid or expired session token");
                return Err((
                    StatusCode::UNAUTHORIZED,
                    "Invalid or expired token".to_string(),
                ));
            }
        };

        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid session subject".to_string()))?;

        Ok(AuthUser(user_id))
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| {
            auth.strip_prefix("Bearer ")
                .or_else(|| auth.strip_prefix("bearer "))
                .map(|s| s.to_string())
        })
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let cookies = parts
        .headers
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())?;
    extract_cookie_value(cookies, "token")
}

/// Pull a cookie value out of a raw `Cookie` header.
pub(crate) fn extract_cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|cookie| {
        let mut parts = cookie.trim().splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(key), Some(value)) if key == name => Some(value.to_string()),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    fn pending() -> PendingUser {
        PendingUser {
            username: "jdoe".into(),
            email: "jdoe@example.com".into(),
            password_hash: "$argon2id$fake".into(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            phone_no: "+12025550123".into(),
        }
    }

    #[tokio::test]
    async fn sign_and_verify_session_token() {
        let keys = make_keys();
        let user_id = ObjectId::new();
        let token = keys.sign_session(user_id).expect("sign session");
        let claims = keys.verify_session(&token).expect("verify session");
        assert_eq!(claims.sub, user_id.to_hex());
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn sign_and_verify_activation_token_preserves_fields() {
        let keys = make_keys();
        let token = keys.sign_activation(pending()).expect("sign activation");
        let claims = keys.verify_activation(&token).expect("verify activation");
        assert_eq!(claims.username, "jdoe");
        assert_eq!(claims.email, "jdoe@example.com");
        assert_eq!(claims.password_hash, "$argon2id$fake");
        assert_eq!(claims.phone_no, "+12025550123");
    }

    #[tokio::test]
    async fn token_families_do_not_cross_verify() {
        let keys = make_keys();
        let session = keys.sign_session(ObjectId::new()).expect("sign session");
        assert!(keys.verify_activation(&session).is_err());

        let activation = keys.sign_activation(pending()).expect("sign activation");
        assert!(keys.verify_session(&activation).is_err());
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let keys = make_keys();
        let mut token = keys.sign_session(ObjectId::new()).expect("sign session");
        token.push('x');
        assert!(keys.verify_session(&token).is_err());
    }

    #[test]
    fn cookie_value_extraction() {
        assert_eq!(
            extract_cookie_value("token=abc; other=def", "token").as_deref(),
            Some("abc")
        );
        assert_eq!(
            extract_cookie_value("other=def;  token=abc", "token").as_deref(),
            Some("abc")
        );
        assert_eq!(extract_cookie_value("other=def", "token"), None);
        assert_eq!(extract_cookie_value("", "token"), None);
    }
}
