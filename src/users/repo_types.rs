use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ROLE: &str = "user";

/// User document in the `users` collection.
///
/// Serialization here is the persistence format; API responses go through
/// `PublicUser`, which never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_token: Option<String>, // sha-256 hex, never the raw token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_password_expires: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// A fresh, not-yet-inserted document with the default role and timestamps.
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
        phone_no: String,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            username,
            email,
            password_hash,
            first_name,
            last_name,
            role: DEFAULT_ROLE.to_string(),
            phone_no,
            reset_password_token: None,
            reset_password_expires: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User::new(
            "jdoe".into(),
            "jdoe@example.com".into(),
            "$argon2id$fake".into(),
            "John".into(),
            "Doe".into(),
            "+12025550123".into(),
        )
    }

    #[test]
    fn new_user_defaults() {
        let user = sample();
        assert!(user.id.is_none());
        assert_eq!(user.role, DEFAULT_ROLE);
        assert!(user.reset_password_token.is_none());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn document_omits_unset_optional_fields() {
        let doc = mongodb::bson::to_document(&sample()).expect("serialize to bson");
        assert!(!doc.contains_key("_id"));
        assert!(!doc.contains_key("reset_password_token"));
        assert!(!doc.contains_key("reset_password_expires"));
        // The hash must be persisted, it only stays out of API responses.
        assert!(doc.contains_key("password_hash"));
    }

    #[test]
    fn document_roundtrips_through_bson() {
        let mut user = sample();
        user.id = Some(ObjectId::new());
        user.reset_password_token = Some("abc123".into());
        user.reset_password_expires = Some(DateTime::now());

        let doc = mongodb::bson::to_document(&user).expect("serialize");
        let back: User = mongodb::bson::from_document(doc).expect("deserialize");
        assert_eq!(back.id, user.id);
        assert_eq!(back.username, user.username);
        assert_eq!(back.reset_password_token, user.reset_password_token);
    }
}
