//! # Catalog Repositories
//!
//! Categories and brands share one shape (`id, name, description,
//! created_at`) and one repository, parameterized by entity.
//!
//! There is no delete path: products keep pointing at their category and
//! brand ids, and a dangling id simply resolves to `None` in listings.

use serde::de::DeserializeOwned;
use serde_json::json;
use std::marker::PhantomData;
use tracing::info;

use till_core::validation::validate_name;
use till_core::{Brand, Category, NewCatalogEntry, ValidationError};

use crate::document::{
    decode_records, from_record, record_id, to_record, Collection, DocumentStore, Query, Record,
    SortOrder,
};
use crate::error::{ServiceResult, StoreError};

/// An entity stored in a catalog collection.
pub trait CatalogEntity: DeserializeOwned + Send + 'static {
    const COLLECTION: Collection;

    fn name(&self) -> &str;
}

impl CatalogEntity for Category {
    const COLLECTION: Collection = Collection::Categories;

    fn name(&self) -> &str {
        &self.name
    }
}

impl CatalogEntity for Brand {
    const COLLECTION: Collection = Collection::Brands;

    fn name(&self) -> &str {
        &self.name
    }
}

pub type CategoryRepository = CatalogRepository<Category>;
pub type BrandRepository = CatalogRepository<Brand>;

/// Repository for one catalog collection.
#[derive(Debug)]
pub struct CatalogRepository<T> {
    store: DocumentStore,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for CatalogRepository<T> {
    fn clone(&self) -> Self {
        CatalogRepository {
            store: self.store.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: CatalogEntity> CatalogRepository<T> {
    pub fn new(store: DocumentStore) -> Self {
        CatalogRepository {
            store,
            _entity: PhantomData,
        }
    }

    /// All entries sorted by name.
    pub async fn list(&self) -> Vec<T> {
        let query = Query::new().order_by("name", SortOrder::Asc);
        decode_records(
            T::COLLECTION,
            self.store.query(T::COLLECTION, &query).await,
        )
    }

    pub async fn get_by_id(&self, id: i64) -> Option<T> {
        let record = self.store.get_by_id(T::COLLECTION, id).await?;
        decode_records(T::COLLECTION, vec![record]).pop()
    }

    /// Creates an entry. Names are unique within the collection
    /// (case-insensitive).
    pub async fn create(&self, input: NewCatalogEntry) -> ServiceResult<T> {
        validate_name("name", &input.name)?;
        let input = NewCatalogEntry {
            name: input.name.trim().to_string(),
            ..input
        };

        let mut tx = self.store.begin().await?;
        if name_taken(tx.records(T::COLLECTION).await?, &input.name, None) {
            return Err(ValidationError::duplicate("name", input.name).into());
        }

        let record = tx.insert(T::COLLECTION, to_record(T::COLLECTION, &input)?).await?;
        tx.commit().await?;

        let entry: T = from_record(T::COLLECTION, record)?;
        info!(collection = %T::COLLECTION, name = entry.name(), "Catalog entry created");
        Ok(entry)
    }

    /// Renames an entry / replaces its description.
    pub async fn update(&self, id: i64, input: NewCatalogEntry) -> ServiceResult<T> {
        validate_name("name", &input.name)?;
        let input = NewCatalogEntry {
            name: input.name.trim().to_string(),
            ..input
        };

        let mut tx = self.store.begin().await?;
        if name_taken(tx.records(T::COLLECTION).await?, &input.name, Some(id)) {
            return Err(ValidationError::duplicate("name", input.name).into());
        }

        let record = tx
            .update(T::COLLECTION, to_record(T::COLLECTION, &input)?, "id", &json!(id))
            .await?;
        tx.commit().await?;

        Ok(from_record(T::COLLECTION, record)?)
    }

    /// Like [`get_by_id`](Self::get_by_id) but an error when missing.
    pub async fn require(&self, id: i64) -> ServiceResult<T> {
        self.get_by_id(id)
            .await
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, "id", id).into())
    }
}

fn name_taken(records: &[Record], name: &str, except: Option<i64>) -> bool {
    records.iter().any(|record| {
        let same = record
            .get("name")
            .and_then(|v| v.as_str())
            .map_or(false, |existing| existing.trim().eq_ignore_ascii_case(name));
        same && record_id(record) != except
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;
    use crate::ServiceError;

    #[tokio::test]
    async fn test_categories_sorted_by_name() {
        let db = test_db().await;
        let repo = db.categories();
        for name in ["snacks", "Beverages", "dairy"] {
            repo.create(NewCatalogEntry::new(name)).await.unwrap();
        }

        let names: Vec<_> = repo.list().await.into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Beverages", "dairy", "snacks"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = test_db().await;
        let repo = db.brands();
        repo.create(NewCatalogEntry::new("Acme")).await.unwrap();

        let err = repo.create(NewCatalogEntry::new(" acme ")).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(repo.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_require() {
        let db = test_db().await;
        let repo = db.categories();
        let frozen = repo.create(NewCatalogEntry::new("Frozen")).await.unwrap();

        let renamed = repo
            .update(
                frozen.id,
                NewCatalogEntry {
                    name: "Frozen Foods".to_string(),
                    description: "Freezer aisle".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.id, frozen.id);
        assert_eq!(renamed.description, "Freezer aisle");

        // renaming to its own name is not a duplicate
        assert!(repo
            .update(frozen.id, NewCatalogEntry::new("frozen foods"))
            .await
            .is_ok());

        let missing = repo.require(77).await.unwrap_err();
        assert!(matches!(missing, ServiceError::Store(StoreError::NotFound { .. })));
    }
}
