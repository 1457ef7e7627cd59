use std::sync::Arc;

use mongodb::{
    options::{ClientOptions, ServerAddress},
    Client, Collection,
};

use crate::config::AppConfig;
use crate::db;
use crate::mailer::{MailClient, SmtpMailer};
use crate::users::repo_types::User;

#[derive(Clone)]
pub struct AppState {
    pub users: Collection<User>,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn MailClient>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let database = db::connect(&config.mongo_url, &config.mongo_db).await?;
        let users = database.collection::<User>("users");
        db::ensure_indexes(&users).await?;

        let mailer = Arc::new(SmtpMailer::new(&config.smtp)?) as Arc<dyn MailClient>;

        Ok(Self {
            users,
            config,
            mailer,
        })
    }

    pub fn from_parts(
        users: Collection<User>,
        config: Arc<AppConfig>,
        mailer: Arc<dyn MailClient>,
    ) -> Self {
        Self {
            users,
            config,
            mailer,
        }
    }

    /// State for unit tests: a mailer that only records, and a client that
    /// is never dialed (the driver connects lazily, so holding a collection
    /// handle is safe without a running server).
    pub fn fake() -> Self {
        use crate::config::{JwtConfig, SmtpConfig};
        use crate::mailer::MockMailer;

        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: "localhost".into(),
                port: Some(27017),
            }])
            .build();
        let client = Client::with_options(options).expect("lazy client ok");
        let users = client.database("clucon_test").collection::<User>("users");

        let config = Arc::new(AppConfig {
            mongo_url: "mongodb://localhost:27017".into(),
            mongo_db: "clucon_test".into(),
            public_url: "http://localhost:8080".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                activation_secret: "test-activation-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                session_ttl_minutes: 5,
                activation_ttl_minutes: 5,
                reset_ttl_minutes: 30,
            },
            smtp: SmtpConfig {
                host: "localhost".into(),
                port: 1025,
                username: String::new(),
                password: String::new(),
                from: "no-reply@test.local".into(),
                use_tls: false,
            },
        });

        let mailer = Arc::new(MockMailer::new()) as Arc<dyn MailClient>;

        Self {
            users,
            config,
            mailer,
        }
    }
}
