use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

/// Public part of the user returned to clients.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "phoneNo")]
    pub phone_no: String,
    pub role: String,
    pub created_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_no: user.phone_no.clone(),
            role: user.role.clone(),
            created_at: user
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

/// Response wrapping a single user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: PublicUser,
}

/// Request body for PUT /me. The current password gates the change.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "phoneNo")]
    pub phone_no: String,
}

/// Request body for PUT /me/password.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    fn sample_user() -> User {
        let mut user = User::new(
            "jdoe".into(),
            "jdoe@example.com".into(),
            "$argon2id$v=19$m=19456,t=2,p=1$secret".into(),
            "John".into(),
            "Doe".into(),
            "+12025550123".into(),
        );
        user.id = Some(ObjectId::new());
        user
    }

    #[test]
    fn public_user_never_carries_the_hash() {
        let user = sample_user();
        let json = serde_json::to_string(&PublicUser::from(&user)).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn public_user_wire_shape() {
        let user = sample_user();
        let public = PublicUser::from(&user);
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("\"phoneNo\":\"+12025550123\""));
        assert!(json.contains(&format!("\"id\":\"{}\"", user.id.unwrap().to_hex())));
        assert!(json.contains("\"role\":\"user\""));
    }

    #[test]
    fn update_profile_request_accepts_wire_names() {
        let req: UpdateProfileRequest = serde_json::from_str(
            r#"{"email":"a@b.co","password":"secret1","first_name":"A","last_name":"B","phoneNo":"0123456789"}"#,
        )
        .unwrap();
        assert_eq!(req.phone_no, "0123456789");
    }
}
