//! Report row assembly
//!
//! Ordering contract: stable sort by invoice date ascending; rows without a
//! usable date (undated successes and failure placeholders) form a single
//! trailing bucket in original upload order. Ties among dated rows keep
//! upload order too.

use std::cmp::Ordering;

use chrono::NaiveDate;
use factura_common::money;

use crate::store::{FileRecord, FileStatus};

/// Sentinel suffix when the raw identifier contains no digits at all.
pub const SUFFIX_NOT_FOUND: &str = "SUFFIX_NOT_FOUND";

/// Date cell for rows whose file failed processing.
pub const DATE_ERROR: &str = "ERROR";

/// Date cell for successful rows without an extracted date.
pub const DATE_NOT_FOUND: &str = "no date found";

const NOT_AVAILABLE: &str = "N/A";

/// One line of the final report. All cells are pre-formatted strings; the
/// writer does no further interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub date: String,
    pub suffix: String,
    pub target_total: String,
    pub foreign_total: String,
    pub foreign_code: String,
    pub rate: String,
    pub vendor_name: String,
    pub is_placeholder: bool,
}

/// Last four digits of the raw invoice identifier, zero-padded.
///
/// `"INV-2023-00057"` -> `"0057"`, `"7"` -> `"0007"`, `"ABC"` -> the
/// sentinel.
pub fn derive_suffix(raw: &str) -> String {
    let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return SUFFIX_NOT_FOUND.to_string();
    }
    let tail: String = digits
        .iter()
        .skip(digits.len().saturating_sub(4))
        .collect();
    format!("{tail:0>4}")
}

fn success_row(file: &FileRecord) -> ReportRow {
    let date = match file.invoice_date {
        Some(d) => d.format("%d/%m/%Y").to_string(),
        None => DATE_NOT_FOUND.to_string(),
    };
    ReportRow {
        date,
        suffix: derive_suffix(file.invoice_identifier.as_deref().unwrap_or("")),
        target_total: file
            .converted_amount
            .as_ref()
            .map(money::format_amount)
            .unwrap_or_default(),
        foreign_total: file
            .total_amount
            .as_ref()
            .map(money::format_amount)
            .unwrap_or_default(),
        foreign_code: file.original_currency.clone().unwrap_or_default(),
        // Blank rate marks the same-currency shortcut
        rate: file.exchange_rate.as_ref().map(money::format_rate).unwrap_or_default(),
        vendor_name: file.vendor_name.clone().unwrap_or_default(),
        is_placeholder: false,
    }
}

fn placeholder_row(file: &FileRecord) -> ReportRow {
    ReportRow {
        date: DATE_ERROR.to_string(),
        suffix: file.filename.clone(),
        target_total: NOT_AVAILABLE.to_string(),
        foreign_total: NOT_AVAILABLE.to_string(),
        foreign_code: NOT_AVAILABLE.to_string(),
        rate: NOT_AVAILABLE.to_string(),
        vendor_name: NOT_AVAILABLE.to_string(),
        is_placeholder: true,
    }
}

/// Assemble ordered report rows from resolved files.
///
/// Expects `files` in upload order; the sort below is stable, which is what
/// keeps the trailing bucket and date ties in upload order.
pub fn assemble(files: &[FileRecord]) -> Vec<ReportRow> {
    let mut keyed: Vec<(Option<NaiveDate>, ReportRow)> = files
        .iter()
        .map(|file| match file.status {
            FileStatus::Success => (file.invoice_date, success_row(file)),
            _ => (None, placeholder_row(file)),
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    keyed.into_iter().map(|(_, row)| row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn success(position: i32, date: Option<(i32, u32, u32)>) -> FileRecord {
        let mut file = FileRecord::new(
            Uuid::new_v4(),
            position,
            format!("file-{position}.pdf"),
            "USD".into(),
        );
        file.status = FileStatus::Success;
        file.invoice_date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
        file.invoice_identifier = Some(format!("INV-{position}"));
        file.original_currency = Some("EUR".into());
        file.total_amount = Some(dec("100.00"));
        file.exchange_rate = Some(dec("1.1000"));
        file.converted_amount = Some(dec("110.00"));
        file.vendor_name = Some("Acme".into());
        file
    }

    fn failed(position: i32) -> FileRecord {
        let mut file = FileRecord::new(
            Uuid::new_v4(),
            position,
            format!("broken-{position}.pdf"),
            "USD".into(),
        );
        file.mark_failed("extraction failed");
        file
    }

    #[test]
    fn test_suffix_strips_non_digits_and_keeps_last_four() {
        assert_eq!(derive_suffix("INV-2023-00057"), "0057");
        assert_eq!(derive_suffix("7"), "0007");
        assert_eq!(derive_suffix("ABC"), SUFFIX_NOT_FOUND);
        assert_eq!(derive_suffix(""), SUFFIX_NOT_FOUND);
        assert_eq!(derive_suffix("12 / 34 / 5678"), "5678");
    }

    #[test]
    fn test_dated_rows_sort_ascending_with_trailing_bucket() {
        // Upload order: Feb, Jan, no date, failure
        let files = vec![
            success(0, Some((2024, 2, 1))),
            success(1, Some((2024, 1, 10))),
            success(2, None),
            failed(3),
        ];

        let rows = assemble(&files);
        assert_eq!(rows[0].date, "10/01/2024");
        assert_eq!(rows[1].date, "01/02/2024");
        assert_eq!(rows[2].date, DATE_NOT_FOUND);
        assert_eq!(rows[3].date, DATE_ERROR);
    }

    #[test]
    fn test_trailing_bucket_keeps_upload_order() {
        let files = vec![failed(0), success(1, None), failed(2)];
        let rows = assemble(&files);
        assert_eq!(rows[0].suffix, "broken-0.pdf");
        assert!(!rows[1].is_placeholder);
        assert_eq!(rows[2].suffix, "broken-2.pdf");
    }

    #[test]
    fn test_date_ties_keep_upload_order() {
        let mut first = success(0, Some((2024, 1, 10)));
        first.vendor_name = Some("First".into());
        let mut second = success(1, Some((2024, 1, 10)));
        second.vendor_name = Some("Second".into());

        let rows = assemble(&[first, second]);
        assert_eq!(rows[0].vendor_name, "First");
        assert_eq!(rows[1].vendor_name, "Second");
    }

    #[test]
    fn test_placeholder_row_contents() {
        let rows = assemble(&[failed(0)]);
        let row = &rows[0];
        assert!(row.is_placeholder);
        assert_eq!(row.date, DATE_ERROR);
        assert_eq!(row.suffix, "broken-0.pdf");
        assert_eq!(row.target_total, "N/A");
        assert_eq!(row.rate, "N/A");
        assert_eq!(row.vendor_name, "N/A");
    }

    #[test]
    fn test_success_row_formats_amounts_and_rate() {
        let rows = assemble(&[success(0, Some((2024, 1, 5)))]);
        let row = &rows[0];
        assert_eq!(row.date, "05/01/2024");
        assert_eq!(row.suffix, "0000");
        assert_eq!(row.target_total, "110.00");
        assert_eq!(row.foreign_total, "100.00");
        assert_eq!(row.foreign_code, "EUR");
        assert_eq!(row.rate, "1.1000");
        assert_eq!(row.vendor_name, "Acme");
    }

    #[test]
    fn test_fractional_cent_total_rounds_half_up_in_report() {
        // Extracted totals are stored at source precision; only the
        // rendered cell rounds.
        let mut file = success(0, Some((2024, 1, 5)));
        file.total_amount = Some(dec("19.995"));
        file.converted_amount = Some(dec("21.99"));

        let rows = assemble(&[file]);
        assert_eq!(rows[0].foreign_total, "20.00");
        assert_eq!(rows[0].target_total, "21.99");
    }

    #[test]
    fn test_same_currency_row_has_blank_rate() {
        let mut file = success(0, Some((2024, 1, 5)));
        file.original_currency = Some("USD".into());
        file.exchange_rate = None;

        let rows = assemble(&[file]);
        assert_eq!(rows[0].rate, "");
    }
}
