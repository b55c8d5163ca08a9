//! # Sale Totals
//!
//! The one formula every sale amount derives from, the settlement rule for
//! tendered cash, and the check the store runs on caller-computed totals.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  subtotal     = Σ line.quantity × line.price                            │
//! │  discounted   = subtotal - subtotal × discount%                         │
//! │  tax_amount   = discounted × tax_rate%                                  │
//! │  grand_total  = discounted + tax_amount + shipping                      │
//! │                                                                         │
//! │  change       = max(0, received - grand_total)                          │
//! │                                                                         │
//! │  Example: 100.00, 10%, 8.5%, 5.00                                       │
//! │    discounted = 90.00, tax = 7.65, grand_total = 102.65                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::{Money, Percent};
use crate::sale::{PaymentStatus, PaymentType, SaleLineRequest, SaleRequest, SaleStatus};
use crate::TOTAL_TOLERANCE_CENTS;

// =============================================================================
// Totals
// =============================================================================

/// Derived amounts of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTotals {
    pub subtotal: Money,
    pub discount: Percent,
    pub tax_rate: Percent,
    pub tax_amount: Money,
    pub shipping: Money,
    pub grand_total: Money,
}

impl SaleTotals {
    /// Computes totals from a subtotal.
    ///
    /// ```rust
    /// use till_core::money::{Money, Percent};
    /// use till_core::totals::SaleTotals;
    ///
    /// let totals = SaleTotals::compute(
    ///     Money::from_cents(10000),
    ///     Percent::from_percentage(10.0),
    ///     Percent::from_percentage(8.5),
    ///     Money::from_cents(500),
    /// );
    /// assert_eq!(totals.grand_total.cents(), 10265);
    /// ```
    pub fn compute(subtotal: Money, discount: Percent, tax_rate: Percent, shipping: Money) -> Self {
        let discounted = subtotal.apply_discount(discount);
        let tax_amount = discounted.percent_of(tax_rate);

        SaleTotals {
            subtotal,
            discount,
            tax_rate,
            tax_amount,
            shipping,
            grand_total: discounted + tax_amount + shipping,
        }
    }

    /// Computes totals from line items (`Σ quantity × price`).
    pub fn from_lines(
        lines: &[SaleLineRequest],
        discount: Percent,
        tax_rate: Percent,
        shipping: Money,
    ) -> Self {
        let subtotal = lines
            .iter()
            .map(|line| line.price.multiply_quantity(line.quantity))
            .sum();
        SaleTotals::compute(subtotal, discount, tax_rate, shipping)
    }

    /// Amount of the discount in money.
    #[inline]
    pub fn discount_amount(&self) -> Money {
        self.subtotal.percent_of(self.discount)
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// What the customer handed over and what they get back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub received_amount: Money,
    pub change_amount: Money,
}

impl Settlement {
    /// `received = received ?? grand_total`, `change = max(0, received - grand_total)`.
    ///
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::totals::Settlement;
    ///
    /// let exact = Settlement::derive(Money::from_cents(1000), None);
    /// assert_eq!(exact.change_amount, Money::zero());
    ///
    /// let cash = Settlement::derive(Money::from_cents(1000), Some(Money::from_cents(2000)));
    /// assert_eq!(cash.change_amount.cents(), 1000);
    /// ```
    pub fn derive(grand_total: Money, received: Option<Money>) -> Self {
        let received_amount = received.unwrap_or(grand_total);
        let change_amount = (received_amount - grand_total).max(Money::zero());
        Settlement {
            received_amount,
            change_amount,
        }
    }
}

// =============================================================================
// Verification
// =============================================================================

/// Checks caller-computed amounts against the formula.
///
/// Every line total, the subtotal, the tax amount and the grand total must
/// agree within `TOTAL_TOLERANCE_CENTS`.
pub fn verify_request_totals(request: &SaleRequest) -> CoreResult<()> {
    for line in &request.sale_items {
        let expected = line.price.multiply_quantity(line.quantity);
        check_amount(
            &format!("total of product {}", line.product_id),
            expected,
            line.total,
        )?;
    }

    let expected = SaleTotals::from_lines(
        &request.sale_items,
        request.discount,
        request.tax_rate,
        request.shipping,
    );

    check_amount("subtotal", expected.subtotal, request.subtotal)?;
    check_amount("tax_amount", expected.tax_amount, request.tax_amount)?;
    check_amount("grand_total", expected.grand_total, request.grand_total)?;

    Ok(())
}

fn check_amount(field: &str, expected: Money, submitted: Money) -> CoreResult<()> {
    if expected.distance(submitted) > TOTAL_TOLERANCE_CENTS {
        return Err(CoreError::TotalMismatch {
            field: field.to_string(),
            expected,
            submitted,
        });
    }
    Ok(())
}

// =============================================================================
// Sale Draft
// =============================================================================

/// Builds a consistently priced [`SaleRequest`], the way the checkout screen
/// assembles one from its cart.
///
/// ```rust
/// use till_core::money::{Money, Percent};
/// use till_core::totals::SaleDraft;
///
/// let request = SaleDraft::new()
///     .line(1, 2, Money::from_cents(2500))
///     .line(2, 1, Money::from_cents(5000))
///     .discount(Percent::from_percentage(10.0))
///     .tax_rate(Percent::from_percentage(8.5))
///     .shipping(Money::from_cents(500))
///     .build();
///
/// assert_eq!(request.subtotal.cents(), 10000);
/// assert_eq!(request.grand_total.cents(), 10265);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SaleDraft {
    customer_id: Option<i64>,
    lines: Vec<SaleLineRequest>,
    discount: Percent,
    tax_rate: Percent,
    shipping: Money,
    received_amount: Option<Money>,
    payment_type: PaymentType,
    payment_status: PaymentStatus,
    status: SaleStatus,
    note: String,
}

impl SaleDraft {
    pub fn new() -> Self {
        SaleDraft::default()
    }

    /// Adds a line; `total` is derived from quantity and price.
    pub fn line(mut self, product_id: i64, quantity: i64, price: Money) -> Self {
        self.lines.push(SaleLineRequest::new(product_id, quantity, price));
        self
    }

    pub fn customer(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn discount(mut self, discount: Percent) -> Self {
        self.discount = discount;
        self
    }

    pub fn tax_rate(mut self, tax_rate: Percent) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn shipping(mut self, shipping: Money) -> Self {
        self.shipping = shipping;
        self
    }

    pub fn received(mut self, received: Money) -> Self {
        self.received_amount = Some(received);
        self
    }

    pub fn payment_type(mut self, payment_type: PaymentType) -> Self {
        self.payment_type = payment_type;
        self
    }

    pub fn payment_status(mut self, payment_status: PaymentStatus) -> Self {
        self.payment_status = payment_status;
        self
    }

    pub fn status(mut self, status: SaleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    pub fn build(self) -> SaleRequest {
        let totals = SaleTotals::from_lines(&self.lines, self.discount, self.tax_rate, self.shipping);

        SaleRequest {
            customer_id: self.customer_id,
            sale_items: self.lines,
            subtotal: totals.subtotal,
            discount: totals.discount,
            tax_rate: totals.tax_rate,
            tax_amount: totals.tax_amount,
            shipping: totals.shipping,
            grand_total: totals.grand_total,
            received_amount: self.received_amount,
            payment_type: self.payment_type,
            payment_status: self.payment_status,
            status: self.status,
            note: self.note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_total_derivation() {
        let totals = SaleTotals::compute(
            Money::from_cents(10000),
            Percent::from_percentage(10.0),
            Percent::from_percentage(8.5),
            Money::from_cents(500),
        );
        assert_eq!(totals.discount_amount().cents(), 1000);
        assert_eq!(totals.tax_amount.cents(), 765);
        assert_eq!(totals.grand_total.cents(), 10265);
        assert!((totals.grand_total.as_major() - 102.65).abs() < 1e-9);
    }

    #[test]
    fn test_no_discount_no_tax() {
        let totals = SaleTotals::compute(Money::from_cents(4200), Percent::zero(), Percent::zero(), Money::zero());
        assert_eq!(totals.grand_total.cents(), 4200);
        assert!(totals.tax_amount.is_zero());
    }

    #[test]
    fn test_settlement_never_negative_change() {
        let short = Settlement::derive(Money::from_cents(1000), Some(Money::from_cents(800)));
        assert_eq!(short.received_amount.cents(), 800);
        assert_eq!(short.change_amount, Money::zero());

        let over = Settlement::derive(Money::from_cents(10265), Some(Money::from_cents(12000)));
        assert_eq!(over.change_amount.cents(), 1735);
    }

    #[test]
    fn test_verify_accepts_drafted_request() {
        let request = SaleDraft::new()
            .line(1, 3, Money::from_cents(333))
            .tax_rate(Percent::from_percentage(7.25))
            .build();
        assert!(verify_request_totals(&request).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_grand_total() {
        let mut request = SaleDraft::new().line(1, 1, Money::from_cents(1000)).build();
        request.grand_total = Money::from_cents(1);

        match verify_request_totals(&request) {
            Err(CoreError::TotalMismatch { field, expected, submitted }) => {
                assert_eq!(field, "grand_total");
                assert_eq!(expected.cents(), 1000);
                assert_eq!(submitted.cents(), 1);
            }
            other => panic!("expected TotalMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_verify_rejects_wrong_line_total() {
        let mut request = SaleDraft::new().line(9, 2, Money::from_cents(500)).build();
        request.sale_items[0].total = Money::from_cents(500);
        let err = verify_request_totals(&request).unwrap_err();
        assert!(matches!(err, CoreError::TotalMismatch { ref field, .. } if field == "total of product 9"));
    }

    #[test]
    fn test_verify_tolerates_one_cent() {
        let mut request = SaleDraft::new().line(1, 1, Money::from_cents(1000)).build();
        request.grand_total = Money::from_cents(1001);
        assert!(verify_request_totals(&request).is_ok());
    }
}
