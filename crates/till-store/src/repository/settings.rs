//! # Settings Repository
//!
//! Key-value application settings (`currency`, `store_name`, default tax
//! rate, ...). `set` is an upsert, so a key appears at most once.

use serde_json::{json, Value};
use tracing::debug;

use till_core::validation::validate_name;
use till_core::Setting;

use crate::document::{decode_records, from_record, Collection, DocumentStore, Record};
use crate::error::ServiceResult;

const SETTINGS: Collection = Collection::Settings;

#[derive(Debug, Clone)]
pub struct SettingsRepository {
    store: DocumentStore,
}

impl SettingsRepository {
    pub fn new(store: DocumentStore) -> Self {
        SettingsRepository { store }
    }

    /// Value stored under `key`.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.all()
            .await
            .into_iter()
            .find(|setting| setting.key == key)
            .map(|setting| setting.value)
    }

    /// Every setting in insertion order.
    pub async fn all(&self) -> Vec<Setting> {
        decode_records(SETTINGS, self.store.get_collection(SETTINGS).await)
    }

    /// Inserts or replaces the value under `key`.
    pub async fn set(&self, key: &str, value: impl Into<String>) -> ServiceResult<Setting> {
        let key = key.trim();
        validate_name("key", key)?;
        let value = value.into();

        let mut tx = self.store.begin().await?;
        let existing = tx.find_one(SETTINGS, "key", &json!(key)).await?;

        let mut fields = Record::new();
        fields.insert("value".to_string(), Value::from(value));

        let record = match existing {
            Some(_) => tx.update(SETTINGS, fields, "key", &json!(key)).await?,
            None => {
                fields.insert("key".to_string(), Value::from(key));
                tx.insert(SETTINGS, fields).await?
            }
        };
        tx.commit().await?;

        debug!(key, "Setting stored");
        Ok(from_record(SETTINGS, record)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_set_is_an_upsert() {
        let db = test_db().await;
        let settings = db.settings();

        assert!(settings.get("currency").await.is_none());

        let first = settings.set("currency", "USD").await.unwrap();
        let second = settings.set("currency", "EUR").await.unwrap();
        settings.set("store_name", "Corner Shop").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(settings.get("currency").await.as_deref(), Some("EUR"));
        assert_eq!(settings.all().await.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_key_rejected() {
        let db = test_db().await;
        assert!(db.settings().set("  ", "x").await.unwrap_err().is_validation());
    }
}
