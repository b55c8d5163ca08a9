//! # User Repository
//!
//! Staff accounts. Passwords are stored as argon2 PHC strings in a
//! `password_hash` field that never leaves this module: every read decodes
//! into [`User`], which has no such field.
//!
//! ```text
//! create(NewUser{password})            authenticate(email, password)
//!        │                                    │
//!        ▼                                    ▼
//!  argon2 hash (random salt)            find by email (case-insensitive)
//!        │                                    │
//!        ▼                                    ▼
//!  users: {.., password_hash}  ───────► verify against password_hash
//! ```

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use serde_json::Value;
use tracing::{debug, info, warn};

use till_core::validation::{validate_email, validate_name, validate_password};
use till_core::{NewUser, User, ValidationError};

use crate::document::{decode_records, from_record, Collection, DocumentStore, Record, StoreTx};
use crate::error::{ServiceResult, StoreError};

const USERS: Collection = Collection::Users;

#[derive(Debug, Clone)]
pub struct UserRepository {
    store: DocumentStore,
}

impl UserRepository {
    pub fn new(store: DocumentStore) -> Self {
        UserRepository { store }
    }

    pub async fn list(&self) -> Vec<User> {
        self.store.get_typed(USERS).await
    }

    pub async fn get_by_id(&self, id: i64) -> Option<User> {
        let record = self.store.get_by_id(USERS, id).await?;
        decode_records(USERS, vec![record]).pop()
    }

    /// Creates an account. Emails are unique (case-insensitive).
    pub async fn create(&self, input: NewUser) -> ServiceResult<User> {
        let mut tx = self.store.begin().await?;
        let user = create_in(&mut tx, input).await?;
        tx.commit().await?;

        info!(id = user.id, role = ?user.role, "User created");
        Ok(user)
    }

    /// Returns the user when `password` matches the stored hash.
    pub async fn authenticate(&self, email: &str, password: &str) -> Option<User> {
        let records = self.store.get_collection(USERS).await;
        let record = records
            .into_iter()
            .find(|record| email_matches(record, email.trim()))?;

        let hash = record.get("password_hash").and_then(Value::as_str)?;
        if !verify_password(password, hash) {
            debug!("Password mismatch");
            return None;
        }

        decode_records(USERS, vec![record]).pop()
    }
}

/// Account creation inside an open write unit (also used by seeding).
pub(crate) async fn create_in(tx: &mut StoreTx, input: NewUser) -> ServiceResult<User> {
    validate_name("name", &input.name)?;
    validate_email(&input.email)?;
    validate_password(&input.password)?;

    let email = input.email.trim().to_lowercase();
    if tx
        .records(USERS)
        .await?
        .iter()
        .any(|record| email_matches(record, &email))
    {
        return Err(ValidationError::duplicate("email", email).into());
    }

    let mut fields = Record::new();
    fields.insert("name".to_string(), Value::from(input.name.trim()));
    fields.insert("email".to_string(), Value::from(email));
    fields.insert(
        "role".to_string(),
        serde_json::to_value(input.role).map_err(|e| StoreError::serialization(USERS, "encode role", e))?,
    );
    fields.insert(
        "password_hash".to_string(),
        Value::from(hash_password(&input.password)?),
    );

    let record = tx.insert(USERS, fields).await?;
    Ok(from_record(USERS, record)?)
}

fn email_matches(record: &Record, email: &str) -> bool {
    record
        .get("email")
        .and_then(Value::as_str)
        .map_or(false, |stored| stored.eq_ignore_ascii_case(email))
}

/// Hashes a password with a fresh random salt.
fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StoreError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "Stored password hash is malformed");
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use till_core::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ana Admin".to_string(),
            email: email.to_string(),
            password: "correct horse battery".to_string(),
            role: Role::Admin,
        }
    }

    #[tokio::test]
    async fn test_password_is_stored_hashed_and_verifies() {
        let db = test_db().await;
        let user = db.users().create(new_user("Ana@Example.com")).await.unwrap();
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.role, Role::Admin);

        let stored = db.documents().get_by_id(USERS, user.id).await.unwrap();
        let hash = stored["password_hash"].as_str().unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(!hash.contains("correct horse"));

        let ok = db
            .users()
            .authenticate("ANA@example.com", "correct horse battery")
            .await;
        assert_eq!(ok.map(|u| u.id), Some(user.id));

        assert!(db.users().authenticate("ana@example.com", "wrong password").await.is_none());
        assert!(db.users().authenticate("nobody@example.com", "x").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_and_weak_password_rejected() {
        let db = test_db().await;
        db.users().create(new_user("ben@example.com")).await.unwrap();

        let dup = db.users().create(new_user("BEN@example.com")).await.unwrap_err();
        assert!(dup.is_validation());

        let weak = NewUser {
            password: "short".to_string(),
            ..new_user("cy@example.com")
        };
        assert!(db.users().create(weak).await.unwrap_err().is_validation());
        assert_eq!(db.users().list().await.len(), 1);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
