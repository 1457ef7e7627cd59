use std::time::Duration;

use mongodb::{
    bson::doc,
    options::{ClientOptions, IndexOptions},
    Client, Collection, Database, IndexModel,
};
use tracing::info;

use crate::users::repo_types::User;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}

/// Connect to MongoDB and return a handle to the application database.
pub async fn connect(url: &str, db_name: &str) -> Result<Database, DbError> {
    let mut options = ClientOptions::parse(url).await?;

    options.max_pool_size = Some(20);
    options.min_pool_size = Some(2);
    options.connect_timeout = Some(Duration::from_secs(10));
    options.server_selection_timeout = Some(Duration::from_secs(30));
    options.app_name = Some("clucon".to_string());

    let client = Client::with_options(options)?;
    let db = client.database(db_name);

    // Verify the connection before the server starts taking traffic.
    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

    info!(db = %db_name, "connected to MongoDB");
    Ok(db)
}

/// Create the unique indexes the user collection relies on. Duplicate-key
/// write errors from these indexes surface as HTTP 409 in the handlers.
pub async fn ensure_indexes(users: &Collection<User>) -> Result<(), DbError> {
    let unique = || IndexOptions::builder().unique(true).build();

    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "username": 1 })
                .options(unique())
                .build(),
        )
        .await?;
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique())
                .build(),
        )
        .await?;
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "phone_no": 1 })
                .options(unique())
                .build(),
        )
        .await?;

    info!("user collection indexes ensured");
    Ok(())
}
