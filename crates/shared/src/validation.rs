//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Maximum length of a plan or module slug.
pub const MAX_SLUG_LENGTH: usize = 64;

/// Maximum length of a plan or module display name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Filter value meaning "no filter" in listing queries.
pub const FILTER_ALL: &str = "all";

lazy_static! {
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

/// Validates a slug: lowercase ASCII letters, digits and single dashes.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
        let mut err = ValidationError::new("slug_length");
        err.message = Some(format!("Slug must be 1-{} characters", MAX_SLUG_LENGTH).into());
        return Err(err);
    }
    if !SLUG_REGEX.is_match(slug) {
        let mut err = ValidationError::new("slug_format");
        err.message =
            Some("Slug may only contain lowercase letters, digits and single dashes".into());
        return Err(err);
    }
    Ok(())
}

/// Validates a display name: 1-100 characters once surrounding whitespace is trimmed.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let length = name.trim().chars().count();
    if length == 0 || length > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_length");
        err.message = Some(format!("Name must be 1-{} characters", MAX_NAME_LENGTH).into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a price is a finite, non-negative amount.
pub fn validate_price(price: f64) -> Result<(), ValidationError> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("price_range");
        err.message = Some("Price must be a non-negative amount".into());
        Err(err)
    }
}

/// Normalizes an optional filter value.
///
/// Returns `None` for absent, blank, or the [`FILTER_ALL`] sentinel so the
/// caller omits the predicate instead of sending an unsatisfiable one.
pub fn normalize_filter(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(FILTER_ALL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("pro").is_ok());
        assert!(validate_slug("enterprise-2024").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("Pro").is_err());
        assert!(validate_slug("pro--plan").is_err());
        assert!(validate_slug("-pro").is_err());
        assert!(validate_slug("with space").is_err());
    }

    #[test]
    fn test_validate_slug_length() {
        let long = "a".repeat(MAX_SLUG_LENGTH + 1);
        let err = validate_slug(&long).unwrap_err();
        assert_eq!(err.code, "slug_length");
        assert!(validate_slug(&"a".repeat(MAX_SLUG_LENGTH)).is_ok());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Pro").is_ok());
        assert!(validate_name("  Pro  ").is_ok());
        assert!(validate_name("").is_err());
        assert_eq!(validate_name("   ").unwrap_err().code, "name_length");
        assert!(validate_name(&"n".repeat(MAX_NAME_LENGTH)).is_ok());
        assert!(validate_name(&"n".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(0.0).is_ok());
        assert!(validate_price(29.99).is_ok());
        assert!(validate_price(-0.01).is_err());
        assert!(validate_price(f64::NAN).is_err());
        assert!(validate_price(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_price_error_message() {
        let err = validate_price(-1.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Price must be a non-negative amount"
        );
    }

    #[test]
    fn test_normalize_filter() {
        assert_eq!(normalize_filter(None), None);
        assert_eq!(normalize_filter(Some("")), None);
        assert_eq!(normalize_filter(Some("   ")), None);
        assert_eq!(normalize_filter(Some("all")), None);
        assert_eq!(normalize_filter(Some("ALL")), None);
        assert_eq!(normalize_filter(Some(" active ")), Some("active"));
    }
}
