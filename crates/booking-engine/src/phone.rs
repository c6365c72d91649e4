//! Canonical phone numbers.
//!
//! The canonical form is the only key used for storing and looking up
//! clients, so `8 (999) 123-45-67`, `+7 999 123 45 67` and `79991234567`
//! all name the same person.

use crate::error::{BookingError, Result};

/// E.164 numbers carry at most 15 digits.
const MAX_DIGITS: usize = 15;

/// Normalize a phone number to `+<digits>`.
///
/// Every non-digit is dropped. An 11-digit number starting with `8` or `7`
/// is a Russian trunk/country form and becomes `+7` followed by its last
/// ten digits. Anything else is the digit string prefixed with `+`.
///
/// The function is idempotent: its output normalizes to itself.
///
/// # Errors
/// Returns `BookingError::InvalidInput` if the input has no digits or more
/// digits than E.164 allows.
pub fn normalize_phone(raw: &str) -> Result<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(BookingError::InvalidInput(format!(
            "phone '{}' contains no digits",
            raw
        )));
    }
    if digits.len() > MAX_DIGITS {
        return Err(BookingError::InvalidInput(format!(
            "phone '{}' has more than {} digits",
            raw, MAX_DIGITS
        )));
    }

    if digits.len() == 11 && (digits.starts_with('8') || digits.starts_with('7')) {
        return Ok(format!("+7{}", &digits[1..]));
    }
    Ok(format!("+{}", digits))
}
