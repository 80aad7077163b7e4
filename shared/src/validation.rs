//! Validation utilities for the Retail Management Platform

use chrono::{DateTime, Utc};

// ============================================================================
// Movement Validations
// ============================================================================

/// Validate a movement quantity (sale line, scrap, transfer line)
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity < 1 {
        return Err("Quantity must be at least 1");
    }
    Ok(())
}

/// Validate a tax value, percent or absolute
pub fn validate_tax_value(value: rust_decimal::Decimal) -> Result<(), &'static str> {
    if value < rust_decimal::Decimal::ZERO {
        return Err("Tax must not be negative");
    }
    Ok(())
}

/// Validate a transfer rejection reason
pub fn validate_rejection_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("Rejection reason must not be empty");
    }
    Ok(())
}

/// Check whether a discount is redeemable at `now`
pub fn discount_is_usable(
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    is_active && expires_at.map_or(true, |exp| exp > now)
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate a phone number: 9-15 digits, optional leading +
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let trimmed = phone.strip_prefix('+').unwrap_or(phone);
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 9 || digits.len() > 15 {
        return Err("Phone number must have 9 to 15 digits");
    }
    Ok(())
}

/// Validate a store code (3-10 uppercase alphanumeric)
pub fn validate_store_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 3 {
        return Err("Store code must be at least 3 characters");
    }
    if code.len() > 10 {
        return Err("Store code must be at most 10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Store code must be uppercase alphanumeric only");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expired_discount_is_not_usable() {
        let now = Utc::now();
        assert!(!discount_is_usable(true, Some(now - Duration::hours(1)), now));
        assert!(discount_is_usable(true, Some(now + Duration::hours(1)), now));
        assert!(discount_is_usable(true, None, now));
        assert!(!discount_is_usable(false, None, now));
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(1).is_ok());
    }

    #[test]
    fn tax_must_not_be_negative() {
        use rust_decimal::Decimal;

        assert!(validate_tax_value(Decimal::new(-1, 0)).is_err());
        assert!(validate_tax_value(Decimal::ZERO).is_ok());
        assert!(validate_tax_value(Decimal::new(75, 1)).is_ok());
    }
}
