//! CSV serialization of assembled report rows

use thiserror::Error;

use super::assembler::ReportRow;

#[derive(Debug, Error)]
pub enum ReportWriteError {
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer flush failed: {0}")]
    Flush(String),
}

/// Serialize rows to CSV bytes. The target currency names the converted
/// total column so the header reads e.g. `USD Total Price`.
pub fn write_csv(target_currency: &str, rows: &[ReportRow]) -> Result<Vec<u8>, ReportWriteError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let converted_header = format!("{target_currency} Total Price");
    writer.write_record([
        "Date",
        "Invoice Suffix",
        converted_header.as_str(),
        "Foreign Currency Total Price",
        "Foreign Currency Code",
        "Exchange Rate",
        "Vendor Name",
    ])?;

    for row in rows {
        writer.write_record([
            &row.date,
            &row.suffix,
            &row.target_total,
            &row.foreign_total,
            &row.foreign_code,
            &row.rate,
            &row.vendor_name,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| ReportWriteError::Flush(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: &str, suffix: &str) -> ReportRow {
        ReportRow {
            date: date.into(),
            suffix: suffix.into(),
            target_total: "110.00".into(),
            foreign_total: "100.00".into(),
            foreign_code: "EUR".into(),
            rate: "1.1000".into(),
            vendor_name: "Acme".into(),
            is_placeholder: false,
        }
    }

    #[test]
    fn test_header_names_target_currency() {
        let bytes = write_csv("USD", &[]).unwrap();
        let csv = String::from_utf8(bytes).unwrap();
        assert!(csv.starts_with(
            "Date,Invoice Suffix,USD Total Price,Foreign Currency Total Price,\
             Foreign Currency Code,Exchange Rate,Vendor Name"
        ));
    }

    #[test]
    fn test_rows_serialize_in_given_order() {
        let bytes = write_csv("GBP", &[row("10/01/2024", "0057"), row("01/02/2024", "0007")]).unwrap();
        let csv = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "10/01/2024,0057,110.00,100.00,EUR,1.1000,Acme");
        assert_eq!(lines[2], "01/02/2024,0007,110.00,100.00,EUR,1.1000,Acme");
    }

    #[test]
    fn test_vendor_with_comma_is_quoted() {
        let mut with_comma = row("10/01/2024", "0001");
        with_comma.vendor_name = "Acme, Inc.".into();
        let bytes = write_csv("USD", &[with_comma]).unwrap();
        let csv = String::from_utf8(bytes).unwrap();
        assert!(csv.contains("\"Acme, Inc.\""));
    }
}
