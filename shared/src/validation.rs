//! Validation rules shared by the backend and the webview
//!
//! Field-shape checks (lengths, email syntax) live on the backend input types;
//! these cover the ledger's domain rules.

use rust_decimal::Decimal;

/// Largest unit quantity accepted on any line
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Largest unit price accepted, so a line total stays far inside `Decimal`
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

pub const MAX_UNIT_PER_CARTON: i64 = 100_000;

/// 10^15
pub const MAX_TARGET_AMOUNT: Decimal = Decimal::from_parts(2_764_472_320, 232_830, 0, false, 0);

// ============================================================================
// Product Validations
// ============================================================================

/// Cartons must hold at least one unit, or carton math would divide by zero
pub fn validate_unit_per_carton(unit_per_carton: i64) -> Result<(), &'static str> {
    if unit_per_carton < 1 {
        return Err("Units per carton must be at least 1");
    }
    if unit_per_carton > MAX_UNIT_PER_CARTON {
        return Err("Units per carton is too large");
    }
    Ok(())
}

pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price > MAX_PRICE {
        return Err("Price is too large");
    }
    Ok(())
}

// ============================================================================
// Quantity Validations
// ============================================================================

/// Sold/returned pair of a daily-entry line
pub fn validate_sold_and_returned(sold: i64, returned: i64) -> Result<(), &'static str> {
    if sold < 0 || returned < 0 {
        return Err("Quantities cannot be negative");
    }
    if sold > MAX_QUANTITY {
        return Err("Quantity is too large");
    }
    if returned > sold {
        return Err("Returned quantity cannot exceed sold quantity");
    }
    Ok(())
}

/// Quantity/return pair of an order line
pub fn validate_order_quantity(quantity: i64, return_quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than zero");
    }
    if quantity > MAX_QUANTITY {
        return Err("Quantity is too large");
    }
    if return_quantity < 0 {
        return Err("Return quantity cannot be negative");
    }
    if return_quantity > quantity {
        return Err("Return quantity cannot exceed ordered quantity");
    }
    Ok(())
}

// ============================================================================
// Target Validations
// ============================================================================

pub fn validate_month(month: u32) -> Result<(), &'static str> {
    if !(1..=12).contains(&month) {
        return Err("Month must be between 1 and 12");
    }
    Ok(())
}

pub fn validate_year(year: i32) -> Result<(), &'static str> {
    if !(2000..=2100).contains(&year) {
        return Err("Year must be between 2000 and 2100");
    }
    Ok(())
}

pub fn validate_target_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Target amount cannot be negative");
    }
    if amount > MAX_TARGET_AMOUNT {
        return Err("Target amount is too large");
    }
    Ok(())
}

// ============================================================================
// Contact Validations
// ============================================================================

/// Pakistani mobile number: `03XXXXXXXXX` or `+923XXXXXXXXX`, spaces and
/// dashes ignored
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let local = if let Some(rest) = digits.strip_prefix("+92") {
        format!("0{}", rest)
    } else if let Some(rest) = digits.strip_prefix("92") {
        format!("0{}", rest)
    } else {
        digits
    };
    if local.len() == 11 && local.starts_with("03") && local.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("Phone number must look like 03XXXXXXXXX")
    }
}
