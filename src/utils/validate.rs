//! Input validation for search requests.
//!
//! The inbound boundary validates requests before they reach the engine; the
//! aggregator runs the same checks again so the year ordering holds even for
//! requests built in code.

use chrono::Datelike;
use thiserror::Error;

/// Earliest publication year accepted in filters
pub const MIN_YEAR: i32 = 1900;

/// Largest page size a request may ask for
pub const MAX_PAGE_SIZE: u32 = 200;

/// Most collaboration countries a request may name
pub const MAX_COLLABORATION_COUNTRIES: usize = 4;

/// Validation error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Year {year} is outside {min}..={max}")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("year_to ({to}) is before year_from ({from})")]
    YearRangeReversed { from: i32, to: i32 },

    #[error("At most {max} collaboration countries are allowed, got {count}")]
    TooManyCountries { count: usize, max: usize },

    #[error("Invalid country code: {0:?}")]
    InvalidCountryCode(String),

    #[error("Page must be at least 1")]
    InvalidPage,

    #[error("Page size must be within 1..={max}, got {size}")]
    InvalidPageSize { size: u32, max: u32 },

    #[error("authors_count must be at least 1")]
    InvalidAuthorsCount,
}

/// The current calendar year (UTC)
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

/// Validate a filter year against `MIN_YEAR..=current_year`
pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    let max = current_year();
    if !(MIN_YEAR..=max).contains(&year) {
        return Err(ValidationError::YearOutOfRange {
            year,
            min: MIN_YEAR,
            max,
        });
    }
    Ok(())
}

/// Validate that `to` is not before `from` when both are set
pub fn validate_year_range(from: Option<i32>, to: Option<i32>) -> Result<(), ValidationError> {
    match (from, to) {
        (Some(from), Some(to)) if to < from => Err(ValidationError::YearRangeReversed { from, to }),
        _ => Ok(()),
    }
}

/// Validate the collaboration country list.
///
/// Blank entries are tolerated (translators drop them); anything else must be
/// a two-letter code.
pub fn validate_countries(countries: &[String]) -> Result<(), ValidationError> {
    if countries.len() > MAX_COLLABORATION_COUNTRIES {
        return Err(ValidationError::TooManyCountries {
            count: countries.len(),
            max: MAX_COLLABORATION_COUNTRIES,
        });
    }

    for code in countries.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountryCode(code.to_string()));
        }
    }

    Ok(())
}

/// Validate a 1-based page number
pub fn validate_page(page: u32) -> Result<(), ValidationError> {
    if page == 0 {
        return Err(ValidationError::InvalidPage);
    }
    Ok(())
}

/// Validate a requested page size
pub fn validate_page_size(size: u32) -> Result<(), ValidationError> {
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(ValidationError::InvalidPageSize {
            size,
            max: MAX_PAGE_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_year_bounds() {
        assert!(validate_year(1900).is_ok());
        assert!(validate_year(current_year()).is_ok());
        assert!(validate_year(1899).is_err());
        assert!(validate_year(current_year() + 1).is_err());
    }

    #[test]
    fn test_validate_year_range() {
        assert!(validate_year_range(Some(2020), Some(2020)).is_ok());
        assert!(validate_year_range(Some(2020), None).is_ok());
        assert!(validate_year_range(None, Some(2020)).is_ok());
        assert_eq!(
            validate_year_range(Some(2021), Some(2020)),
            Err(ValidationError::YearRangeReversed {
                from: 2021,
                to: 2020
            })
        );
    }

    #[test]
    fn test_validate_countries() {
        let ok: Vec<String> = vec!["RU".into(), "us".into(), " ".into()];
        assert!(validate_countries(&ok).is_ok());

        let bad: Vec<String> = vec!["Russia".into()];
        assert_eq!(
            validate_countries(&bad),
            Err(ValidationError::InvalidCountryCode("Russia".into()))
        );

        let many: Vec<String> = ["RU", "US", "CN", "DE", "FR"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(matches!(
            validate_countries(&many),
            Err(ValidationError::TooManyCountries { count: 5, max: 4 })
        ));
    }

    #[test]
    fn test_validate_page_size() {
        assert!(validate_page_size(1).is_ok());
        assert!(validate_page_size(200).is_ok());
        assert!(validate_page_size(0).is_err());
        assert!(validate_page_size(201).is_err());
    }
}
