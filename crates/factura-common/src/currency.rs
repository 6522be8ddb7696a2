//! ISO 4217 currency code helpers
//!
//! The pipeline never ships a full currency table; the exchange-rate service
//! is the authority on which codes exist. Validation here only enforces the
//! shape of a code (three ASCII letters) so malformed input is rejected
//! before a job is created.

use crate::error::CommonError;

/// Normalize a currency code to its canonical uppercase form.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validate that a string has the shape of an ISO 4217 code.
pub fn validate_code(code: &str) -> Result<String, CommonError> {
    let normalized = normalize_code(code);
    if normalized.len() == 3 && normalized.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(normalized)
    } else {
        Err(CommonError::InvalidCurrency(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercase() {
        assert_eq!(normalize_code("usd"), "USD");
        assert_eq!(normalize_code(" eur "), "EUR");
    }

    #[test]
    fn test_validate_accepts_well_formed_codes() {
        assert_eq!(validate_code("ils").unwrap(), "ILS");
        assert_eq!(validate_code("USD").unwrap(), "USD");
    }

    #[test]
    fn test_validate_rejects_malformed_codes() {
        assert!(validate_code("").is_err());
        assert!(validate_code("US").is_err());
        assert!(validate_code("DOLLARS").is_err());
        assert!(validate_code("U$D").is_err());
    }
}
