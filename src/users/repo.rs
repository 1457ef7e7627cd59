use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    options::ReturnDocument,
    Collection,
};

use crate::users::repo_types::User;

/// Fields a profile update is allowed to touch.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
}

impl User {
    /// Find a user by email.
    pub async fn find_by_email(
        users: &Collection<User>,
        email: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = users.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    /// Find a user by username.
    pub async fn find_by_username(
        users: &Collection<User>,
        username: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = users.find_one(doc! { "username": username }).await?;
        Ok(user)
    }

    /// Find a user by id.
    pub async fn find_by_id(
        users: &Collection<User>,
        id: ObjectId,
    ) -> anyhow::Result<Option<User>> {
        let user = users.find_one(doc! { "_id": id }).await?;
        Ok(user)
    }

    /// Insert a new user document and return its assigned id.
    pub async fn insert(users: &Collection<User>, user: &User) -> anyhow::Result<ObjectId> {
        let result = users.insert_one(user).await?;
        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("insert did not return an ObjectId"))
    }

    /// Apply a profile update and return the document as it is afterwards.
    pub async fn update_profile(
        users: &Collection<User>,
        id: ObjectId,
        update: &ProfileUpdate,
    ) -> anyhow::Result<Option<User>> {
        let updated = users
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": {
                    "email": update.email.as_str(),
                    "first_name": update.first_name.as_str(),
                    "last_name": update.last_name.as_str(),
                    "phone_no": update.phone_no.as_str(),
                    "updated_at": DateTime::now(),
                }},
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    /// Replace the password hash and drop any pending reset token.
    pub async fn set_password(
        users: &Collection<User>,
        id: ObjectId,
        password_hash: &str,
    ) -> anyhow::Result<()> {
        users
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": { "password_hash": password_hash, "updated_at": DateTime::now() },
                    "$unset": { "reset_password_token": "", "reset_password_expires": "" },
                },
            )
            .await?;
        Ok(())
    }

    /// Store a hashed reset token and its expiry on the document.
    pub async fn set_reset_token(
        users: &Collection<User>,
        id: ObjectId,
        token_hash: &str,
        expires: DateTime,
    ) -> anyhow::Result<()> {
        users
            .update_one(
                doc! { "_id": id },
                doc! { "$set": {
                    "reset_password_token": token_hash,
                    "reset_password_expires": expires,
                    "updated_at": DateTime::now(),
                }},
            )
            .await?;
        Ok(())
    }

    /// Look up the user holding an unexpired reset token.
    pub async fn find_by_reset_token(
        users: &Collection<User>,
        token_hash: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = users
            .find_one(doc! {
                "reset_password_token": token_hash,
                "reset_password_expires": { "$gt": DateTime::now() },
            })
            .await?;
        Ok(user)
    }
}

/// True when the error is a unique-index violation (Mongo error code 11000).
pub fn is_duplicate_key(err: &anyhow::Error) -> bool {
    let Some(mongo_err) = err.downcast_ref::<mongodb::error::Error>() else {
        return false;
    };
    match *mongo_err.kind {
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref we)) => {
            we.code == 11000
        }
        _ => false,
    }
}
