//! # Write Units
//!
//! A [`StoreTx`] is one locked SQLite transaction covering every collection
//! write of an operation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  store.begin()                                                          │
//! │    ├── acquire single-writer lock      (waits for other writers)        │
//! │    └── BEGIN                                                            │
//! │                                                                         │
//! │  tx.records / insert / update / delete                                  │
//! │    └── each collection is loaded once, then mutated in memory           │
//! │                                                                         │
//! │  tx.commit()                                                            │
//! │    ├── write every dirty collection blob  (one write each)              │
//! │    ├── write advanced id counters                                       │
//! │    ├── COMMIT                                                           │
//! │    ├── deliver queued audit events                                      │
//! │    └── release lock                                                     │
//! │                                                                         │
//! │  drop(tx) without commit ──► ROLLBACK, nothing written                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! While a `StoreTx` is alive it owns a pooled connection. Code holding one
//! must not read through the pool, since an in-memory database has exactly
//! one connection.

use chrono::Utc;
use serde_json::Value;
use sqlx::{Sqlite, Transaction};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use super::query::values_match;
use super::{decode_collection, encode_collection, record_id, sequence_key, substrate};
use super::{Collection, Record, INITIALIZED_KEY};
use crate::audit::{AuditEvent, AuditSink};
use crate::error::{StoreError, StoreResult};

/// A unit of work over the document store.
pub struct StoreTx {
    tx: Transaction<'static, Sqlite>,
    writer: OwnedMutexGuard<()>,
    sink: Arc<dyn AuditSink>,
    loaded: HashMap<Collection, Vec<Record>>,
    dirty: BTreeSet<Collection>,
    sequences: HashMap<Collection, i64>,
    mark_initialized: bool,
    events: Vec<AuditEvent>,
}

impl StoreTx {
    pub(crate) fn new(
        tx: Transaction<'static, Sqlite>,
        writer: OwnedMutexGuard<()>,
        sink: Arc<dyn AuditSink>,
    ) -> Self {
        StoreTx {
            tx,
            writer,
            sink,
            loaded: HashMap::new(),
            dirty: BTreeSet::new(),
            sequences: HashMap::new(),
            mark_initialized: false,
            events: Vec::new(),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Loads a collection into the unit (once) and returns its records.
    ///
    /// A blob that cannot be decoded is an error here: writing back over it
    /// would destroy the stored data.
    pub async fn records(&mut self, collection: Collection) -> StoreResult<&[Record]> {
        self.ensure_loaded(collection).await?;
        Ok(self
            .loaded
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or(&[]))
    }

    /// First record whose `id` equals `id`, cloned.
    pub async fn get_by_id(&mut self, collection: Collection, id: i64) -> StoreResult<Option<Record>> {
        let records = self.records(collection).await?;
        Ok(records.iter().find(|r| record_id(r) == Some(id)).cloned())
    }

    /// First record where `field` equals `value`, cloned.
    pub async fn find_one(
        &mut self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Option<Record>> {
        let records = self.records(collection).await?;
        Ok(records
            .iter()
            .find(|r| r.get(field).map_or(false, |v| values_match(v, value)))
            .cloned())
    }

    /// Whether the `INITIALIZED` sentinel is set, read inside this unit.
    /// Holding the writer lock, no other unit can set it before this one
    /// commits.
    pub async fn is_initialized(&mut self) -> StoreResult<bool> {
        if self.mark_initialized {
            return Ok(true);
        }
        let value = substrate::read_value(&mut *self.tx, INITIALIZED_KEY).await?;
        Ok(value.as_deref() == Some("true"))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Assigns the next id, stamps `created_at`, appends the record.
    pub async fn insert(&mut self, collection: Collection, mut fields: Record) -> StoreResult<Record> {
        self.ensure_loaded(collection).await?;
        let id = self.next_id(collection).await?;

        fields.insert("id".to_string(), Value::from(id));
        fields.insert(
            "created_at".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        self.records_mut(collection).push(fields.clone());
        debug!(collection = %collection, id, "Record inserted");
        Ok(fields)
    }

    /// Merges `fields` into the first record where `where_field == where_value`.
    /// The `id` of the stored record is never overwritten.
    pub async fn update(
        &mut self,
        collection: Collection,
        fields: Record,
        where_field: &str,
        where_value: &Value,
    ) -> StoreResult<Record> {
        self.ensure_loaded(collection).await?;

        let record = self
            .records_mut(collection)
            .iter_mut()
            .find(|r| r.get(where_field).map_or(false, |v| values_match(v, where_value)))
            .ok_or_else(|| StoreError::not_found(collection, where_field, where_value))?;

        for (key, value) in fields {
            if key != "id" {
                record.insert(key, value);
            }
        }

        Ok(record.clone())
    }

    /// Removes every record where `where_field == where_value`.
    /// Returns whether anything was removed.
    pub async fn delete(
        &mut self,
        collection: Collection,
        where_field: &str,
        where_value: &Value,
    ) -> StoreResult<bool> {
        self.ensure_loaded(collection).await?;

        let records = self.records_mut(collection);
        let before = records.len();
        records.retain(|r| !r.get(where_field).map_or(false, |v| values_match(v, where_value)));

        Ok(records.len() < before)
    }

    /// Replaces the whole collection without reading what was there.
    pub fn replace(&mut self, collection: Collection, records: Vec<Record>) {
        self.loaded.insert(collection, records);
        self.dirty.insert(collection);
    }

    /// Sets the `INITIALIZED` sentinel when the unit commits.
    pub fn mark_initialized(&mut self) {
        self.mark_initialized = true;
    }

    /// Queues an audit event, delivered only if the unit commits.
    pub fn audit(&mut self, event: AuditEvent) {
        self.events.push(event);
    }

    /// Writes every touched collection and commits.
    pub async fn commit(self) -> StoreResult<()> {
        let StoreTx {
            mut tx,
            writer,
            sink,
            loaded,
            dirty,
            sequences,
            mark_initialized,
            events,
        } = self;

        for collection in &dirty {
            let records = loaded.get(collection).map(Vec::as_slice).unwrap_or(&[]);
            let blob = encode_collection(records)
                .map_err(|e| StoreError::serialization(*collection, "commit", e))?;
            substrate::write_value(&mut *tx, collection.as_str(), &blob)
                .await
                .map_err(|e| StoreError::write(*collection, "commit", e))?;
        }

        for (collection, last_id) in &sequences {
            substrate::write_value(&mut *tx, &sequence_key(*collection), &last_id.to_string())
                .await
                .map_err(|e| StoreError::write(*collection, "advance id counter", e))?;
        }

        if mark_initialized {
            substrate::write_value(&mut *tx, INITIALIZED_KEY, "true").await?;
        }

        tx.commit().await?;
        drop(writer);

        debug!(collections = ?dirty, "Write unit committed");

        for event in &events {
            sink.record(event);
        }

        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn ensure_loaded(&mut self, collection: Collection) -> StoreResult<()> {
        if self.loaded.contains_key(&collection) {
            return Ok(());
        }

        let raw = substrate::read_value(&mut *self.tx, collection.as_str())
            .await
            .map_err(|e| StoreError::write(collection, "load", e))?;

        let records = match raw {
            Some(raw) => decode_collection(&raw)
                .map_err(|e| StoreError::serialization(collection, "load", e))?,
            None => Vec::new(),
        };

        self.loaded.insert(collection, records);
        Ok(())
    }

    fn records_mut(&mut self, collection: Collection) -> &mut Vec<Record> {
        self.dirty.insert(collection);
        self.loaded.entry(collection).or_default()
    }

    /// `max(stored counter, max existing id) + 1`
    async fn next_id(&mut self, collection: Collection) -> StoreResult<i64> {
        let last = match self.sequences.get(&collection) {
            Some(last) => *last,
            None => {
                let raw = substrate::read_value(&mut *self.tx, &sequence_key(collection))
                    .await
                    .map_err(|e| StoreError::write(collection, "read id counter", e))?;
                match raw {
                    Some(raw) => raw
                        .trim()
                        .parse::<i64>()
                        .map_err(|e| StoreError::serialization(collection, "read id counter", e))?,
                    None => 0,
                }
            }
        };

        let max_existing = self
            .loaded
            .get(&collection)
            .and_then(|records| records.iter().filter_map(record_id).max())
            .unwrap_or(0);

        let next = last.max(max_existing) + 1;
        self.sequences.insert(collection, next);
        Ok(next)
    }
}
