//! Input validation, applied before any statement is built.

use chrono::{Days, NaiveDate};
use std::fmt;

use crate::error::{Error, Result};

/// Length of a patient identifier.
pub const PATIENT_ID_LEN: usize = 10;

/// Largest row limit accepted by name searches.
pub const MAX_SEARCH_LIMIT: u32 = 1000;

/// A validated patient identifier: exactly ten ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatientId(String);

impl PatientId {
    pub fn parse(value: &str) -> Result<Self> {
        if value.len() != PATIENT_ID_LEN {
            return Err(Error::invalid_patient_id(value, "must be exactly 10 digits"));
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_patient_id(value, "must contain only digits 0-9"));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a name search compares the kana full name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatch {
    /// Whole name equals the input.
    Exact,
    /// Name contains the input.
    #[default]
    Partial,
}

/// Validate a name search input and row limit, returning the trimmed name.
pub fn search_name(name: &str, limit: u32) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_search("name cannot be empty"));
    }
    if limit == 0 || limit > MAX_SEARCH_LIMIT {
        return Err(Error::invalid_search(format!(
            "limit must be between 1 and {}, got {}",
            MAX_SEARCH_LIMIT, limit
        )));
    }
    Ok(trimmed)
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// First day after the range; rows before its midnight are inside.
    pub fn end_exclusive(&self) -> Result<NaiveDate> {
        self.end
            .checked_add_days(Days::new(1))
            .ok_or(Error::InvalidDate {
                value: self.end.to_string(),
            })
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_id_valid() {
        let id = PatientId::parse("0000000001").unwrap();
        assert_eq!(id.as_str(), "0000000001");
        assert_eq!(id.to_string(), "0000000001");
    }

    #[test]
    fn test_patient_id_invalid() {
        for bad in ["", "123", "00000000001", "00000O0001", "000000000-", "０００００００００１", "1' OR '1'='1"] {
            let err = PatientId::parse(bad).unwrap_err();
            assert!(err.is_validation(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_search_name() {
        assert_eq!(search_name("  ヤマダ ", 100).unwrap(), "ヤマダ");
        assert!(search_name("   ", 100).unwrap_err().is_validation());
        assert!(search_name("ヤマダ", 0).unwrap_err().is_validation());
        assert!(search_name("ヤマダ", MAX_SEARCH_LIMIT + 1).is_err());
        assert!(search_name("ヤマダ", MAX_SEARCH_LIMIT).is_ok());
    }

    #[test]
    fn test_date_range() {
        let range = DateRange::parse("2024-01-01", "2024-12-31").unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(
            range.end_exclusive().unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );

        // Single day range is valid
        assert!(DateRange::parse("2024-02-29", "2024-02-29").is_ok());
    }

    #[test]
    fn test_date_range_invalid() {
        assert!(matches!(
            DateRange::parse("2024-12-31", "2024-01-01"),
            Err(Error::InvalidDateRange { .. })
        ));
        assert!(matches!(
            DateRange::parse("2024/01/01", "2024-12-31"),
            Err(Error::InvalidDate { .. })
        ));
        assert!(DateRange::parse("2023-02-29", "2023-03-01").is_err());
    }
}
