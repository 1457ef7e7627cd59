use lazy_static::lazy_static;
use regex::Regex;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[\w\-.]+@([\w-]+\.)+[\w-]{2,4}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.trim().len() < MIN_USERNAME_LEN {
        return Err("Username must be at least 3 characters");
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if !is_valid_email(email) {
        return Err("Please enter a valid email address");
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err("Invalid password length, minimum is 6 characters");
    }
    Ok(())
}

/// 10 to 15 characters, digits with an optional leading `+`.
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    lazy_static! {
        static ref PHONE_RE: Regex = Regex::new(r"^\+?\d{9,14}$").unwrap();
    }
    if !(10..=15).contains(&phone.len()) || !PHONE_RE.is_match(phone) {
        return Err("Please enter a valid phone number");
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_email_shapes() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
        assert!(is_valid_email("a-b_c@ex-ample.org"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@example"));
        assert!(!is_valid_email("user name@example.com"));
    }

    #[test]
    fn username_length_bounds() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username("  a ").is_err());
        assert!(validate_username("abc").is_ok());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn phone_shapes() {
        assert!(validate_phone("0123456789").is_ok());
        assert!(validate_phone("+12025550123").is_ok());
        assert!(validate_phone("123456789").is_err()); // too short
        assert!(validate_phone("1234567890123456").is_err()); // too long
        assert!(validate_phone("01234abcde").is_err());
    }
}
