//! # Report Repository
//!
//! Dashboard figures derived from the sales and products collections.
//!
//! ```text
//! sales ──► status == Completed ──┬──► Σ grand_total            = total_revenue
//!                                 ├──► count                    = total_sales
//!                                 └──► created_at date == today
//!                                          └──► Σ grand_total   = today_sales
//!
//! products ──► is_active && stock_quantity <= min_stock ──► count = low_stock_products
//! ```

use chrono::{NaiveDate, Utc};
use tracing::debug;

use till_core::{DashboardStats, Money, Product, Sale, SaleStatus};

use crate::document::{Collection, DocumentStore};

#[derive(Debug, Clone)]
pub struct ReportRepository {
    store: DocumentStore,
}

impl ReportRepository {
    pub fn new(store: DocumentStore) -> Self {
        ReportRepository { store }
    }

    /// Dashboard figures for the current UTC day.
    pub async fn dashboard_stats(&self) -> DashboardStats {
        self.dashboard_stats_on(Utc::now().date_naive()).await
    }

    /// Dashboard figures with `today` pinned to a given date.
    pub async fn dashboard_stats_on(&self, today: NaiveDate) -> DashboardStats {
        let completed: Vec<Sale> = self
            .store
            .get_typed::<Sale>(Collection::Sales)
            .await
            .into_iter()
            .filter(|sale| sale.status == SaleStatus::Completed)
            .collect();

        let today_sales: Money = completed
            .iter()
            .filter(|sale| sale.created_at.date_naive() == today)
            .map(|sale| sale.grand_total)
            .sum();
        let total_revenue: Money = completed.iter().map(|sale| sale.grand_total).sum();

        let low_stock_products = self
            .store
            .get_typed::<Product>(Collection::Products)
            .await
            .iter()
            .filter(|product| product.is_active && product.is_low_stock())
            .count();

        let stats = DashboardStats {
            today_sales,
            total_revenue,
            total_sales: completed.len(),
            low_stock_products,
        };
        debug!(?stats, %today, "Computed dashboard stats");
        stats
    }
}
