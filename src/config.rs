use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub activation_secret: String,
    pub issuer: String,
    pub audience: String,
    pub session_ttl_minutes: i64,
    pub activation_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub use_tls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mongo_url: String,
    pub mongo_db: String,
    pub public_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let mongo_url = std::env::var("MONGODB_URL").context("MONGODB_URL is not set")?;
        let mongo_db = std::env::var("MONGODB_DB").unwrap_or_else(|_| "clucon".into());
        let public_url =
            std::env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET_KEY").context("JWT_SECRET_KEY is not set")?,
            activation_secret: std::env::var("ACTIVATION_SECRET")
                .context("ACTIVATION_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "clucon".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "clucon-users".into()),
            // Matches the lifetime of the session cookie handed to browsers.
            session_ttl_minutes: std::env::var("JWT_EXPIRES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 90),
            activation_ttl_minutes: std::env::var("ACTIVATION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(5),
            reset_ttl_minutes: std::env::var("RESET_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };

        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(1025),
            username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
            password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
            from: std::env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@clucon.io".into()),
            use_tls: std::env::var("SMTP_USE_TLS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        };

        Ok(Self {
            mongo_url,
            mongo_db,
            public_url,
            jwt,
            smtp,
        })
    }
}
