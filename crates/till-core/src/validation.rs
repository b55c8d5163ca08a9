//! # Validation Module
//!
//! Input validation for Till.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: UI                                                            │
//! │  └── Immediate feedback (empty fields, cart math)                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (pure, no storage)                               │
//! │  ├── Structural sale checks (empty sale, non-positive total)           │
//! │  └── Field rules (names, codes, quantities, rates)                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: till-store (needs stored data)                               │
//! │  ├── Stock validation pass                                             │
//! │  └── Uniqueness (product code, user email, setting key)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::{Money, Percent};
use crate::sale::SaleRequest;
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Sale Request
// =============================================================================

/// Structural validation of a sale request, run before any storage access.
///
/// ## Order
/// 1. `EmptySale` when there are no lines
/// 2. `InvalidTotal` when `grand_total <= 0`
/// 3. Line count, quantities, amounts (each at most [`Money::MAX`]) and rates
pub fn validate_sale_request(request: &SaleRequest) -> CoreResult<()> {
    if request.sale_items.is_empty() {
        return Err(CoreError::EmptySale);
    }

    if !request.grand_total.is_positive() {
        return Err(CoreError::InvalidTotal(request.grand_total));
    }

    if request.sale_items.len() > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "sale items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        }
        .into());
    }

    for line in &request.sale_items {
        validate_quantity(line.quantity)?;
        validate_amount("price", line.price)?;
    }

    validate_amount("shipping", request.shipping)?;
    validate_amount("subtotal", request.subtotal)?;
    validate_amount("tax_amount", request.tax_amount)?;
    validate_amount("grand_total", request.grand_total)?;
    validate_rate("discount", request.discount)?;
    validate_rate("tax_rate", request.tax_rate)?;

    if let Some(received) = request.received_amount {
        validate_amount("received_amount", received)?;
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (product, category, brand, customer, user).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 200 characters
///
/// ```rust
/// use till_core::validation::validate_name;
///
/// assert!(validate_name("name", "Cola 330ml").is_ok());
/// assert!(validate_name("name", "   ").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required(field));
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumerics, hyphens, underscores
///
/// ```rust
/// use till_core::validation::validate_code;
///
/// assert!(validate_code("COLA-330").is_ok());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::required("code"));
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address (shape only: `local@domain.tld`).
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Validates a search term and returns it trimmed. Empty means "no filter".
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates a password before hashing (length only).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.chars().count() < 8 {
        return Err(ValidationError::OutOfRange {
            field: "password length".to_string(),
            min: 8,
            max: 128,
        });
    }
    if password.chars().count() > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a stock level written by `set_stock` (zero allowed).
pub fn validate_stock_level(qty: i64) -> ValidationResult<()> {
    if qty < 0 {
        return Err(ValidationError::Negative {
            field: "stock_quantity".to_string(),
        });
    }
    Ok(())
}

/// Validates a monetary amount that may be zero but not negative, and is
/// at most [`Money::MAX`].
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    if amount > Money::MAX {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Money::MAX.cents(),
        });
    }
    Ok(())
}

/// Validates a percentage (0% to 100%).
pub fn validate_rate(field: &str, rate: Percent) -> ValidationResult<()> {
    if rate.bps() > Percent::FULL_BPS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}
