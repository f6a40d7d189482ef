//! Read-only contract with the RAPPORT patient tables.
//!
//! Source columns use the system's positional names (`F001`, `F002`, ...);
//! each projected column gets a stable record key through its alias.

/// A database table read by this crate.
#[derive(Debug, PartialEq, Eq)]
pub struct Table {
    /// Table name in the schema.
    pub name: &'static str,
}

/// One projected column: source column and record key.
///
/// Value types are not declared here; they follow the column type the
/// database reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name in the table.
    pub source: &'static str,
    /// Key of the value in the resulting record.
    pub alias: &'static str,
}

const fn col(source: &'static str, alias: &'static str) -> ColumnSpec {
    ColumnSpec { source, alias }
}

/// Patient basic information, one row per patient.
pub const PATIENT_BASIC: Table = Table { name: "TTPT01" };

/// Patient addresses, keyed by patient and address type.
pub const PATIENT_ADDRESS: Table = Table { name: "TTPT02" };

/// Patient insurance coverage records.
pub const PATIENT_INSURANCE: Table = Table { name: "TTPT11" };

/// Diagnosed disease names per patient.
pub const PATIENT_DISEASE: Table = Table { name: "TTBY01" };

/// Every table the fetcher reads.
pub const ALL_TABLES: [&Table; 4] = [
    &PATIENT_BASIC,
    &PATIENT_ADDRESS,
    &PATIENT_INSURANCE,
    &PATIENT_DISEASE,
];

/// Patient identifier column, shared by all tables.
pub const PATIENT_ID: &str = "F001";
/// Kana full name in `TTPT01`.
pub const KANA_FULL_NAME: &str = "F003";
/// Registration date in `TTPT01`.
pub const REGISTERED_AT: &str = "F023";
/// Address type in `TTPT02`.
pub const ADDRESS_TYPE: &str = "F002";
/// Insurance number in `TTPT11`.
pub const INSURANCE_NO: &str = "F002";
/// Start of treatment in `TTBY01`.
pub const DISEASE_START_DATE: &str = "F006";

pub const BASIC_INFO_COLUMNS: &[ColumnSpec] = &[
    col("F001", "PATIENT_ID"),
    col("F002", "KANA_GIVEN_NAME"),
    col("F003", "KANA_FULL_NAME"),
    col("F004", "KANJI_GIVEN_NAME"),
    col("F005", "KANJI_FULL_NAME"),
    col("F006", "SEX"),
    col("F007", "BIRTH_DATE"),
    col("F008", "BLOOD_TYPE"),
    col("F010", "OCCUPATION"),
    col("F016", "PATIENT_CATEGORY_1"),
    col("F017", "PATIENT_CATEGORY_2"),
    col("F018", "PATIENT_COMMENT_1"),
    col("F019", "PATIENT_COMMENT_2"),
    col("UPDDT", "UPDATED_AT"),
];

/// Columns returned by name searches.
pub const NAME_SEARCH_COLUMNS: &[ColumnSpec] = &[
    col("F001", "PATIENT_ID"),
    col("F002", "KANA_GIVEN_NAME"),
    col("F003", "KANA_FULL_NAME"),
    col("F004", "KANJI_GIVEN_NAME"),
    col("F005", "KANJI_FULL_NAME"),
    col("F006", "SEX"),
    col("F007", "BIRTH_DATE"),
];

/// Columns returned by registration date searches.
pub const REGISTRATION_COLUMNS: &[ColumnSpec] = &[
    col("F001", "PATIENT_ID"),
    col("F002", "KANA_GIVEN_NAME"),
    col("F003", "KANA_FULL_NAME"),
    col("F004", "KANJI_GIVEN_NAME"),
    col("F005", "KANJI_FULL_NAME"),
    col("F006", "SEX"),
    col("F007", "BIRTH_DATE"),
    col("F023", "REGISTERED_AT"),
];

pub const ADDRESS_COLUMNS: &[ColumnSpec] = &[
    col("F001", "PATIENT_ID"),
    col("F002", "ADDRESS_TYPE"),
    col("F003", "POSTAL_CODE"),
    col("F004", "ADDRESS"),
    col("F005", "PHONE_NUMBER"),
    col("UPDDT", "UPDATED_AT"),
];

pub const INSURANCE_COLUMNS: &[ColumnSpec] = &[
    col("F001", "PATIENT_ID"),
    col("F002", "INSURANCE_NO"),
    col("F003", "INSURER_NO"),
    col("F004", "INSURANCE_TYPE"),
    col("F005", "INSURED_RELATION"),
    col("F006", "CARD_SYMBOL"),
    col("F007", "CARD_NUMBER"),
    col("F008", "VALID_FROM"),
    col("F009", "VALID_UNTIL"),
    col("UPDDT", "UPDATED_AT"),
];

pub const DISEASE_COLUMNS: &[ColumnSpec] = &[
    col("F001", "PATIENT_ID"),
    col("F002", "DISEASE_SEQ"),
    col("F003", "DEPARTMENT"),
    col("F004", "DISEASE_CODE"),
    col("F005", "DISEASE_NAME"),
    col("F006", "START_DATE"),
    col("F007", "END_DATE"),
    col("F008", "OUTCOME"),
    col("UPDDT", "UPDATED_AT"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_aliases_unique_per_projection() {
        for columns in [
            BASIC_INFO_COLUMNS,
            NAME_SEARCH_COLUMNS,
            REGISTRATION_COLUMNS,
            ADDRESS_COLUMNS,
            INSURANCE_COLUMNS,
            DISEASE_COLUMNS,
        ] {
            let aliases: HashSet<_> = columns.iter().map(|c| c.alias).collect();
            assert_eq!(aliases.len(), columns.len());
            assert_eq!(columns[0].source, PATIENT_ID);
        }
    }
}
