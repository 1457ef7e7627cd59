use serde::{Deserialize, Serialize};

use crate::users::dto::PublicUser;

/// Request body for registration. No account is created yet; the fields
/// travel inside the activation token until the link is clicked.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(rename = "phoneNo")]
    pub phone_no: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the forgot-password flow.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub password: String,
}

/// Returned after activation and login: the session token also rides in
/// an HttpOnly cookie, the body copy is for non-browser clients.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: PublicUser,
    pub token: String,
}

/// Plain acknowledgement used by register/logout/forgot/reset.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_accepts_wire_names() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{
                "username": "jdoe",
                "email": "jdoe@example.com",
                "password": "secret1",
                "first_name": "John",
                "last_name": "Doe",
                "phoneNo": "0123456789"
            }"#,
        )
        .unwrap();
        assert_eq!(req.username, "jdoe");
        assert_eq!(req.phone_no, "0123456789");
    }
}
