//! # Document Store
//!
//! Named collections of JSON records with integer ids, persisted on a
//! key-value table in SQLite.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      storage (key TEXT PRIMARY KEY)                     │
//! │                                                                         │
//! │  products            → [{"id":1,"name":"Cola",...}, {"id":2,...}]      │
//! │  categories          → [...]                                           │
//! │  sales               → [...]                                           │
//! │  sale_items          → [...]                                           │
//! │  __seq__:products    → 12        (last id handed out)                  │
//! │  INITIALIZED         → true      (demo data seeded)                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read / Write Policy
//! - Reads fail soft: a missing or corrupt collection reads as empty and logs
//!   a warning.
//! - Writes go through a [`StoreTx`] and either commit every collection they
//!   touched or none of them. A write never replaces a blob it could not
//!   decode.
//! - Ids come from a persisted counter, so a deleted id is never handed out
//!   again.

pub mod query;
pub(crate) mod substrate;
mod tx;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::error::{StoreError, StoreResult};

pub use query::{Query, SortOrder};
pub use tx::StoreTx;

/// A stored record: a JSON object.
pub type Record = serde_json::Map<String, Value>;

/// Sentinel key set once demo data has been seeded.
pub const INITIALIZED_KEY: &str = "INITIALIZED";

// =============================================================================
// Collections
// =============================================================================

/// The named collections the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Products,
    Categories,
    Brands,
    Customers,
    Sales,
    SaleItems,
    Users,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Products,
        Collection::Categories,
        Collection::Brands,
        Collection::Customers,
        Collection::Sales,
        Collection::SaleItems,
        Collection::Users,
        Collection::Settings,
    ];

    /// Storage key of the collection.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Collection::Products => "products",
            Collection::Categories => "categories",
            Collection::Brands => "brands",
            Collection::Customers => "customers",
            Collection::Sales => "sales",
            Collection::SaleItems => "sale_items",
            Collection::Users => "users",
            Collection::Settings => "settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn sequence_key(collection: Collection) -> String {
    format!("__seq__:{}", collection.as_str())
}

// =============================================================================
// Record Helpers
// =============================================================================

/// The integer `id` of a record, if it has one.
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Serializes a typed value into a record. The value must serialize to a
/// JSON object.
pub fn to_record<T: Serialize>(collection: Collection, value: &T) -> StoreResult<Record> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::serialization(
            collection,
            "encode record",
            format!("expected an object, got {}", other),
        )),
        Err(e) => Err(StoreError::serialization(collection, "encode record", e)),
    }
}

/// Deserializes a record into a typed value.
pub fn from_record<T: DeserializeOwned>(collection: Collection, record: Record) -> StoreResult<T> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| StoreError::serialization(collection, "decode record", e))
}

/// Decodes every record, skipping (and logging) the ones that do not fit `T`.
pub fn decode_records<T: DeserializeOwned>(collection: Collection, records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record_id(&record);
            match from_record(collection, record) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(collection = %collection, id = ?id, error = %e, "Skipping malformed record");
                    None
                }
            }
        })
        .collect()
}

fn decode_collection(raw: &str) -> Result<Vec<Record>, serde_json::Error> {
    serde_json::from_str(raw)
}

fn encode_collection(records: &[Record]) -> Result<String, serde_json::Error> {
    serde_json::to_string(records)
}

// =============================================================================
// Document Store
// =============================================================================

/// Handle to the collections. Cheap to clone; clones share the pool and the
/// single-writer lock.
///
/// ## Usage
/// ```rust,ignore
/// let store = db.documents();
///
/// let mut fields = Record::new();
/// fields.insert("name".into(), json!("Beverages"));
/// let category = store.insert(Collection::Categories, fields).await?;
///
/// let found = store.search(Collection::Categories, "name", "bev").await;
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
    sink: Arc<dyn AuditSink>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    pub(crate) fn new(pool: SqlitePool, sink: Arc<dyn AuditSink>) -> Self {
        DocumentStore {
            pool,
            writer: Arc::new(Mutex::new(())),
            sink,
        }
    }

    /// The installed audit sink.
    pub fn sink(&self) -> &dyn AuditSink {
        self.sink.as_ref()
    }

    /// Opens a write unit. Waits while another write unit is open.
    pub async fn begin(&self) -> StoreResult<StoreTx> {
        let writer = Arc::clone(&self.writer).lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(StoreTx::new(tx, writer, Arc::clone(&self.sink)))
    }

    // =========================================================================
    // Reads (fail soft)
    // =========================================================================

    /// Every record of a collection in insertion order. Empty when the
    /// collection was never written or cannot be read.
    pub async fn get_collection(&self, collection: Collection) -> Vec<Record> {
        let raw = match substrate::read_value(&self.pool, collection.as_str()).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(collection = %collection, error = %e, "Failed to read collection");
                return Vec::new();
            }
        };

        match raw {
            Some(raw) => decode_collection(&raw).unwrap_or_else(|e| {
                warn!(collection = %collection, error = %e, "Stored collection is corrupt, reading as empty");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    /// Reads a collection and decodes it into `T`, skipping malformed records.
    pub async fn get_typed<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        decode_records(collection, self.get_collection(collection).await)
    }

    pub async fn get_by_id(&self, collection: Collection, id: i64) -> Option<Record> {
        self.get_collection(collection)
            .await
            .into_iter()
            .find(|record| record_id(record) == Some(id))
    }

    /// Case-insensitive substring match on one field.
    pub async fn search(&self, collection: Collection, field: &str, term: &str) -> Vec<Record> {
        Query::new()
            .search(term, [field])
            .apply(self.get_collection(collection).await)
    }

    /// Runs a [`Query`] over a collection.
    pub async fn query(&self, collection: Collection, query: &Query) -> Vec<Record> {
        query.apply(self.get_collection(collection).await)
    }

    /// Whether demo data has been seeded.
    pub async fn is_initialized(&self) -> bool {
        match substrate::read_value(&self.pool, INITIALIZED_KEY).await {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "Failed to read initialization flag");
                false
            }
        }
    }

    // =========================================================================
    // Writes (one write unit each)
    // =========================================================================

    /// Overwrites a collection. Returns `false` (and logs) on failure.
    pub async fn save_collection(&self, collection: Collection, records: Vec<Record>) -> bool {
        let result = async {
            let mut tx = self.begin().await?;
            tx.replace(collection, records);
            tx.commit().await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(collection = %collection, error = %e, "Failed to save collection");
                false
            }
        }
    }

    /// Inserts a record with the next id and `created_at = now`.
    pub async fn insert(&self, collection: Collection, fields: Record) -> StoreResult<Record> {
        let mut tx = self.begin().await?;
        let record = tx.insert(collection, fields).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Merges `fields` into the first record where `where_field == where_value`.
    pub async fn update(
        &self,
        collection: Collection,
        fields: Record,
        where_field: &str,
        where_value: &Value,
    ) -> StoreResult<Record> {
        let mut tx = self.begin().await?;
        let record = tx.update(collection, fields, where_field, where_value).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Removes every record where `where_field == where_value`.
    pub async fn delete(
        &self,
        collection: Collection,
        where_field: &str,
        where_value: &Value,
    ) -> StoreResult<bool> {
        let mut tx = self.begin().await?;
        let removed = tx.delete(collection, where_field, where_value).await?;
        tx.commit().await?;
        debug!(collection = %collection, field = where_field, removed, "Delete applied");
        Ok(removed)
    }

    /// Resets one collection to an empty array. Its id counter is kept.
    pub async fn clear_collection(&self, collection: Collection) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        tx.replace(collection, Vec::new());
        tx.audit(AuditEvent::new(
            "store",
            "clear_collection",
            Value::from(collection.as_str()),
        ));
        tx.commit().await?;
        info!(collection = %collection, "Collection cleared");
        Ok(())
    }

    /// Resets every collection, id counter and the `INITIALIZED` flag.
    pub async fn clear_all(&self) -> StoreResult<()> {
        let _writer = Arc::clone(&self.writer).lock_owned().await;
        let removed = substrate::delete_all(&self.pool).await?;
        info!(keys = removed, "Store cleared");
        self.sink
            .record(&AuditEvent::new("store", "clear_all", Value::from(removed)));
        Ok(())
    }

    /// Sets the `INITIALIZED` flag on its own.
    pub async fn mark_initialized(&self) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        tx.mark_initialized();
        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, test_db, RecordingSink};
    use serde_json::json;

    #[tokio::test]
    async fn test_unwritten_collection_is_empty() {
        let db = test_db().await;
        assert!(db.documents().get_collection(Collection::Brands).await.is_empty());
        assert!(db.documents().get_by_id(Collection::Brands, 1).await.is_none());
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids_and_timestamp() {
        let store = test_db().await.documents();

        let first = store
            .insert(Collection::Categories, record(json!({ "name": "Drinks" })))
            .await
            .unwrap();
        let second = store
            .insert(Collection::Categories, record(json!({ "name": "Snacks" })))
            .await
            .unwrap();

        assert_eq!(record_id(&first), Some(1));
        assert_eq!(record_id(&second), Some(2));
        assert!(first.get("created_at").and_then(Value::as_str).is_some());

        let all = store.get_collection(Collection::Categories).await;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["name"], "Drinks");
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = test_db().await.documents();
        for name in ["a", "b", "c"] {
            store
                .insert(Collection::Brands, record(json!({ "name": name })))
                .await
                .unwrap();
        }

        assert!(store.delete(Collection::Brands, "id", &json!(3)).await.unwrap());
        let next = store
            .insert(Collection::Brands, record(json!({ "name": "d" })))
            .await
            .unwrap();
        assert_eq!(record_id(&next), Some(4));
    }

    #[tokio::test]
    async fn test_counter_follows_saved_ids() {
        let store = test_db().await.documents();
        assert!(
            store
                .save_collection(
                    Collection::Customers,
                    vec![record(json!({ "id": 40, "name": "Imported" }))],
                )
                .await
        );

        let next = store
            .insert(Collection::Customers, record(json!({ "name": "New" })))
            .await
            .unwrap();
        assert_eq!(record_id(&next), Some(41));
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_id() {
        let store = test_db().await.documents();
        store
            .insert(Collection::Settings, record(json!({ "key": "currency", "value": "USD" })))
            .await
            .unwrap();

        let updated = store
            .update(
                Collection::Settings,
                record(json!({ "id": 99, "value": "EUR" })),
                "key",
                &json!("currency"),
            )
            .await
            .unwrap();

        assert_eq!(record_id(&updated), Some(1));
        assert_eq!(updated["value"], "EUR");
        assert_eq!(updated["key"], "currency");
    }

    #[tokio::test]
    async fn test_update_without_match_is_not_found() {
        let store = test_db().await.documents();
        let err = store
            .update(Collection::Products, Record::new(), "id", &json!(7))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { collection: Collection::Products, .. }));
    }

    #[tokio::test]
    async fn test_delete_reports_whether_anything_matched() {
        let store = test_db().await.documents();
        store
            .insert(Collection::Customers, record(json!({ "name": "Ana", "tier": 1 })))
            .await
            .unwrap();
        store
            .insert(Collection::Customers, record(json!({ "name": "Ben", "tier": 1 })))
            .await
            .unwrap();

        assert!(store.delete(Collection::Customers, "tier", &json!(1.0)).await.unwrap());
        assert!(!store.delete(Collection::Customers, "tier", &json!(1)).await.unwrap());
        assert!(store.get_collection(Collection::Customers).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_and_query() {
        let store = test_db().await.documents();
        for (name, category) in [("Cola", 1), ("Water", 1), ("Chips", 2), ("Cola Zero", 1)] {
            store
                .insert(
                    Collection::Products,
                    record(json!({ "name": name, "category_id": category })),
                )
                .await
                .unwrap();
        }

        let found = store.search(Collection::Products, "name", "COLA").await;
        assert_eq!(found.len(), 2);

        let query = Query::new()
            .filter("category_id", json!(1))
            .order_by("name", SortOrder::Desc)
            .limit(2);
        let page = store.query(Collection::Products, &query).await;
        let names: Vec<_> = page.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("Water"), json!("Cola Zero")]);
    }

    #[tokio::test]
    async fn test_corrupt_blob_reads_empty_but_refuses_writes() {
        let db = test_db().await;
        substrate::write_value(db.pool(), "sales", "{not json").await.unwrap();

        let store = db.documents();
        assert!(store.get_collection(Collection::Sales).await.is_empty());

        let err = store
            .insert(Collection::Sales, record(json!({ "grand_total": 1.0 })))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Serialization { collection: Collection::Sales, .. }));

        let raw = substrate::read_value(db.pool(), "sales").await.unwrap();
        assert_eq!(raw.as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn test_dropped_unit_rolls_back() {
        let store = test_db().await.documents();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert(Collection::Brands, record(json!({ "name": "Ghost" })))
                .await
                .unwrap();
        }
        assert!(store.get_collection(Collection::Brands).await.is_empty());

        let next = store
            .insert(Collection::Brands, record(json!({ "name": "Real" })))
            .await
            .unwrap();
        assert_eq!(record_id(&next), Some(1));
    }

    #[tokio::test]
    async fn test_one_unit_spans_collections() {
        let store = test_db().await.documents();
        let mut tx = store.begin().await.unwrap();
        let sale = tx
            .insert(Collection::Sales, record(json!({ "grand_total": 3.0 })))
            .await
            .unwrap();
        tx.insert(
            Collection::SaleItems,
            record(json!({ "sale_id": record_id(&sale), "quantity": 1 })),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.get_collection(Collection::Sales).await.len(), 1);
        assert_eq!(store.get_collection(Collection::SaleItems).await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_collection_and_clear_all() {
        let sink = RecordingSink::new();
        let db = crate::test_support::test_db_with_sink(sink.clone()).await;
        let store = db.documents();

        store
            .insert(Collection::Brands, record(json!({ "name": "a" })))
            .await
            .unwrap();
        store.mark_initialized().await.unwrap();
        assert!(store.is_initialized().await);

        store.clear_collection(Collection::Brands).await.unwrap();
        assert!(store.get_collection(Collection::Brands).await.is_empty());
        let next = store
            .insert(Collection::Brands, record(json!({ "name": "b" })))
            .await
            .unwrap();
        assert_eq!(record_id(&next), Some(2));

        store.clear_all().await.unwrap();
        assert!(!store.is_initialized().await);
        assert!(store.get_collection(Collection::Brands).await.is_empty());

        let operations: Vec<_> = sink.events().iter().map(|e| e.operation).collect();
        assert_eq!(operations, vec!["clear_collection", "clear_all"]);
    }

    #[tokio::test]
    async fn test_typed_reads_skip_malformed_records() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }

        let store = test_db().await.documents();
        store.save_collection(
            Collection::Categories,
            vec![record(json!({ "id": 1, "name": "ok" })), record(json!({ "id": 2 }))],
        )
        .await;

        let named: Vec<Named> = store.get_typed(Collection::Categories).await;
        assert_eq!(named.len(), 1);
        assert_eq!(named[0].name, "ok");
    }
}
