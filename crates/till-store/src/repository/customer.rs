//! # Customer Repository
//!
//! Customers can be attached to sales. Unlike products they are hard-deleted;
//! a sale whose customer is gone resolves `customer` to `None`.

use serde_json::json;
use tracing::{debug, info};

use till_core::validation::{validate_email, validate_name, validate_search_query};
use till_core::{Customer, CustomerFilter, CustomerPatch, NewCustomer, Paginated};

use crate::document::{decode_records, from_record, to_record, Collection, DocumentStore, Query, SortOrder};
use crate::error::{ServiceResult, StoreError};

const CUSTOMERS: Collection = Collection::Customers;

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    store: DocumentStore,
}

impl CustomerRepository {
    pub fn new(store: DocumentStore) -> Self {
        CustomerRepository { store }
    }

    /// Customers sorted by name, searched over name, email and phone.
    pub async fn list(&self, filter: &CustomerFilter) -> ServiceResult<Paginated<Customer>> {
        let search = validate_search_query(filter.search.as_deref().unwrap_or(""))?;
        let query = Query::new()
            .search(search.as_str(), ["name", "email", "phone"])
            .order_by("name", SortOrder::Asc);

        let customers: Vec<Customer> =
            decode_records(CUSTOMERS, self.store.query(CUSTOMERS, &query).await);

        let page = filter.page.paginate(customers);
        debug!(search = %search, total = page.meta.total, "Listed customers");
        Ok(page)
    }

    pub async fn get_by_id(&self, id: i64) -> Option<Customer> {
        let record = self.store.get_by_id(CUSTOMERS, id).await?;
        decode_records(CUSTOMERS, vec![record]).pop()
    }

    pub async fn create(&self, input: NewCustomer) -> ServiceResult<Customer> {
        validate_name("name", &input.name)?;
        if let Some(email) = non_blank(&input.email) {
            validate_email(email)?;
        }

        let input = NewCustomer {
            name: input.name.trim().to_string(),
            email: input.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            ..input
        };

        let record = self
            .store
            .insert(CUSTOMERS, to_record(CUSTOMERS, &input)?)
            .await?;
        let customer: Customer = from_record(CUSTOMERS, record)?;

        info!(id = customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn update(&self, id: i64, patch: CustomerPatch) -> ServiceResult<Customer> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(email) = non_blank(&patch.email) {
            validate_email(email)?;
        }

        let record = self
            .store
            .update(CUSTOMERS, to_record(CUSTOMERS, &patch)?, "id", &json!(id))
            .await?;
        Ok(from_record(CUSTOMERS, record)?)
    }

    /// Removes a customer. Errors when no customer has this id.
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if !self.store.delete(CUSTOMERS, "id", &json!(id)).await? {
            return Err(StoreError::not_found(CUSTOMERS, "id", id).into());
        }
        info!(id, "Customer deleted");
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
