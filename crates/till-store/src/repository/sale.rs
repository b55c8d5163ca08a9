//! # Sale Service
//!
//! Records sales: validates the request against stock, writes the header,
//! its line items and the stock reductions as one write unit, and rebuilds
//! the joined sale view for receipts and dashboards.
//!
//! ## create_sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  SaleRequest                                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. structural checks ── EmptySale / InvalidTotal / quantities          │
//! │  2. totals policy ────── Verify: recompute, reject > 1 cent drift       │
//! │       │                                                                 │
//! │  ┌────▼───────────────── write unit (single-writer lock held) ──────┐  │
//! │  │ 3. stock pass (read-only)                                          │  │
//! │  │    every line: product exists, active, stock >= Σ requested        │  │
//! │  │ 4. settlement: received ?? grand_total, change = max(0, r - g)     │  │
//! │  │ 5. insert sale header                                              │  │
//! │  │ 6. insert sale items (input order)                                 │  │
//! │  │ 7. reduce stock (input order)                                      │  │
//! │  │ 8. COMMIT ─────────────── all of 5..7 or none                      │  │
//! │  └────┬───────────────────────────────────────────────────────────────┘  │
//! │       ▼                                                                 │
//! │  9. get_sale(id) ──► CompleteSale                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two concurrent sales for the same product serialize on the writer lock,
//! so the second one validates against the stock the first one left.

use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, error, info};

use till_core::totals::verify_request_totals;
use till_core::validation::validate_sale_request;
use till_core::{
    CompleteSale, CoreError, Customer, Money, Paginated, PaymentStatus, PaymentType, Percent,
    Product, ProductRef, Sale, SaleFilter, SaleItem, SaleItemView, SaleLineRequest, SaleRequest,
    SaleStatus, SaleSummary, Settlement, ValidationError,
};

use crate::audit::AuditEvent;
use crate::document::{
    decode_records, from_record, record_id, to_record, Collection, DocumentStore, StoreTx,
};
use crate::error::{ServiceResult, StoreError};
use crate::repository::product::reduce_stock_in;

// =============================================================================
// Configuration
// =============================================================================

/// What to do with the amounts the caller computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TotalsPolicy {
    /// Recompute line totals, subtotal, tax and grand total; reject a
    /// difference of more than one cent with `CoreError::TotalMismatch`.
    #[default]
    Verify,
    /// Store the submitted amounts as given.
    Trust,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SaleServiceConfig {
    pub totals: TotalsPolicy,
}

impl SaleServiceConfig {
    pub fn trust_totals(mut self) -> Self {
        self.totals = TotalsPolicy::Trust;
        self
    }
}

// =============================================================================
// Stored shapes
// =============================================================================

#[derive(Serialize)]
struct SaleHeaderFields<'a> {
    customer_id: Option<i64>,
    subtotal: Money,
    discount: Percent,
    tax_rate: Percent,
    tax_amount: Money,
    shipping: Money,
    grand_total: Money,
    received_amount: Money,
    change_amount: Money,
    payment_type: PaymentType,
    payment_status: PaymentStatus,
    status: SaleStatus,
    note: &'a str,
}

#[derive(Serialize)]
struct SaleItemFields {
    sale_id: i64,
    product_id: i64,
    quantity: i64,
    price: Money,
    total: Money,
}

// =============================================================================
// Service
// =============================================================================

/// Sale transaction service.
///
/// ## Usage
/// ```rust,ignore
/// let request = SaleDraft::new()
///     .line(product.id, 2, product.price)
///     .tax_rate(Percent::from_percentage(8.5))
///     .received(Money::from_cents(2000))
///     .build();
///
/// let sale = db.sales().create_sale(&request).await?;
/// println!("Change: {}", sale.sale.change_amount);
/// ```
#[derive(Debug, Clone)]
pub struct SaleService {
    store: DocumentStore,
    config: SaleServiceConfig,
}

impl SaleService {
    pub fn new(store: DocumentStore, config: SaleServiceConfig) -> Self {
        SaleService { store, config }
    }

    pub fn config(&self) -> SaleServiceConfig {
        self.config
    }

    /// Records a sale and returns it fully resolved.
    ///
    /// Either the header, every item and every stock reduction are
    /// committed, or nothing is.
    pub async fn create_sale(&self, request: &SaleRequest) -> ServiceResult<CompleteSale> {
        match self.record_sale(request).await {
            Ok(sale_id) => self.get_sale(sale_id).await,
            Err(err) => {
                if err.is_validation() {
                    info!(error = %err, "Sale rejected");
                } else {
                    error!(error = %err, "Failed to record sale");
                }
                self.store.sink().record(
                    &AuditEvent::new(
                        "sale",
                        "create_sale",
                        json!({
                            "items": request.sale_items.len(),
                            "grand_total": request.grand_total.as_major(),
                        }),
                    )
                    .with_error(&err),
                );
                Err(err)
            }
        }
    }

    async fn record_sale(&self, request: &SaleRequest) -> ServiceResult<i64> {
        validate_sale_request(request)?;
        if self.config.totals == TotalsPolicy::Verify {
            verify_request_totals(request)?;
        }

        let mut tx = self.store.begin().await?;

        validate_stock(&mut tx, &request.sale_items).await?;

        let settlement = Settlement::derive(request.grand_total, request.received_amount);
        let header = SaleHeaderFields {
            customer_id: request.customer_id,
            subtotal: request.subtotal,
            discount: request.discount,
            tax_rate: request.tax_rate,
            tax_amount: request.tax_amount,
            shipping: request.shipping,
            grand_total: request.grand_total,
            received_amount: settlement.received_amount,
            change_amount: settlement.change_amount,
            payment_type: request.payment_type,
            payment_status: request.payment_status,
            status: request.status,
            note: &request.note,
        };

        let sale = tx
            .insert(Collection::Sales, to_record(Collection::Sales, &header)?)
            .await?;
        let sale_id = record_id(&sale)
            .ok_or_else(|| StoreError::Internal("inserted sale has no id".to_string()))?;

        for line in &request.sale_items {
            let item = SaleItemFields {
                sale_id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
                total: line.price.multiply_quantity(line.quantity),
            };
            tx.insert(Collection::SaleItems, to_record(Collection::SaleItems, &item)?)
                .await?;
        }

        for line in &request.sale_items {
            reduce_stock_in(&mut tx, line.product_id, line.quantity).await?;
        }

        tx.audit(AuditEvent::new(
            "sale",
            "create_sale",
            json!({
                "id": sale_id,
                "items": request.sale_items.len(),
                "grand_total": request.grand_total.as_major(),
            }),
        ));
        tx.commit().await?;

        info!(
            sale_id,
            items = request.sale_items.len(),
            grand_total = %request.grand_total,
            "Sale recorded"
        );
        Ok(sale_id)
    }

    /// Sale header + customer + items with product references.
    ///
    /// A missing customer or product resolves to `None`; a missing header is
    /// `CoreError::SaleNotFound`.
    pub async fn get_sale(&self, id: i64) -> ServiceResult<CompleteSale> {
        let record = self
            .store
            .get_by_id(Collection::Sales, id)
            .await
            .ok_or(CoreError::SaleNotFound(id))?;
        let sale: Sale = from_record(Collection::Sales, record)?;

        let customer = match sale.customer_id {
            Some(customer_id) => self.find_customer(customer_id).await,
            None => None,
        };

        let products: HashMap<i64, ProductRef> = self
            .store
            .get_typed::<Product>(Collection::Products)
            .await
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    ProductRef {
                        id: p.id,
                        name: p.name,
                        code: p.code,
                    },
                )
            })
            .collect();

        let sale_items: Vec<SaleItemView> = self
            .store
            .get_typed::<SaleItem>(Collection::SaleItems)
            .await
            .into_iter()
            .filter(|item| item.sale_id == id)
            .map(|item| SaleItemView {
                product: products.get(&item.product_id).cloned(),
                item,
            })
            .collect();

        debug!(sale_id = id, items = sale_items.len(), "Loaded sale");
        Ok(CompleteSale {
            sale,
            customer,
            sale_items,
        })
    }

    /// Sales newest first, optionally limited to an inclusive date range,
    /// each with its customer and item count.
    pub async fn list_sales(&self, filter: &SaleFilter) -> ServiceResult<Paginated<SaleSummary>> {
        if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
            if start > end {
                return Err(ValidationError::InvalidFormat {
                    field: "date range".to_string(),
                    reason: format!("start date {} is after end date {}", start, end),
                }
                .into());
            }
        }

        let mut sales: Vec<Sale> = self
            .store
            .get_typed::<Sale>(Collection::Sales)
            .await
            .into_iter()
            .filter(|sale| filter.contains(sale.created_at.date_naive()))
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let customers: HashMap<i64, Customer> = self
            .store
            .get_typed::<Customer>(Collection::Customers)
            .await
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut item_counts: HashMap<i64, usize> = HashMap::new();
        for item in self.store.get_typed::<SaleItem>(Collection::SaleItems).await {
            *item_counts.entry(item.sale_id).or_insert(0) += 1;
        }

        let page = filter.page.paginate(sales).map(|sale| SaleSummary {
            customer: sale.customer_id.and_then(|id| customers.get(&id).cloned()),
            items_count: item_counts.get(&sale.id).copied().unwrap_or(0),
            sale,
        });

        debug!(total = page.meta.total, returned = page.data.len(), "Listed sales");
        Ok(page)
    }

    async fn find_customer(&self, id: i64) -> Option<Customer> {
        let record = self.store.get_by_id(Collection::Customers, id).await?;
        decode_records(Collection::Customers, vec![record]).pop()
    }
}

/// Read-only pass over every line before anything is written.
///
/// Quantities of repeated products are summed, so two lines of 2 against a
/// stock of 3 fail on the second line with `requested: 4`.
async fn validate_stock(tx: &mut StoreTx, lines: &[SaleLineRequest]) -> ServiceResult<()> {
    let mut requested: HashMap<i64, i64> = HashMap::new();

    for line in lines {
        let record = tx
            .get_by_id(Collection::Products, line.product_id)
            .await?
            .ok_or(CoreError::ProductNotFound(line.product_id))?;
        let product: Product = from_record(Collection::Products, record)?;

        if !product.is_active {
            return Err(CoreError::InactiveProduct(product.id).into());
        }

        let total = requested.entry(product.id).or_insert(0);
        *total += line.quantity;

        if !product.can_sell(*total) {
            return Err(CoreError::InsufficientStock {
                product_id: product.id,
                available: product.stock_quantity,
                requested: *total,
            }
            .into());
        }
    }

    Ok(())
}
