//! Document field-extraction adapter
//!
//! Client for an Azure Document Intelligence-style prebuilt-invoice model.
//! Analysis is asynchronous on the service side: submit bytes, then poll the
//! returned operation until it settles.
//!
//! Extraction is best effort. Fields come back with confidences; a present
//! text field at or below [`CONFIDENCE_THRESHOLD`] is replaced with the
//! [`LOW_CONFIDENCE_PLACEHOLDER`] sentinel, while low-confidence dates and
//! amounts are dropped entirely so downstream arithmetic never runs on
//! guesses.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Minimum confidence for accepting an extracted field value.
pub const CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Sentinel stored when a text field was found but not trusted.
pub const LOW_CONFIDENCE_PLACEHOLDER: &str = "CONFIDENCE_TOO_LOW";

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_POLLS: u32 = 60;

/// Best-effort structured fields for one invoice document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub invoice_date: Option<NaiveDate>,
    pub invoice_identifier: Option<String>,
    pub total_amount: Option<BigDecimal>,
    pub currency_code: Option<String>,
    pub vendor_name: Option<String>,
}

/// Failure modes of the extraction boundary. All of them are file-local and
/// never touch the circuit breaker.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("extraction request failed: {0}")]
    Http(String),

    #[error("unexpected extraction response: {0}")]
    Parse(String),

    #[error("document analysis failed: {0}")]
    Analysis(String),

    #[error("document analysis did not complete in time")]
    Timeout,

    #[error("no invoice recognized in document")]
    NoInvoice,
}

/// Field-extraction boundary.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn extract(&self, bytes: &[u8], mime: &str) -> Result<ExtractedFields, ExtractionError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    error: Option<serde_json::Value>,
    analyze_result: Option<AnalyzeResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeResult {
    documents: Option<Vec<AnalyzedDocument>>,
}

#[derive(Debug, Deserialize)]
struct AnalyzedDocument {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    content: Option<String>,
    value_date: Option<String>,
    value_currency: Option<ValueCurrency>,
    confidence: Option<f64>,
}

impl FieldValue {
    fn is_confident(&self) -> bool {
        self.confidence.unwrap_or(0.0) > CONFIDENCE_THRESHOLD
    }

    /// Text content, replaced by the sentinel when present but untrusted.
    fn trusted_content(&self) -> Option<String> {
        let content = self.content.as_deref()?.trim();
        if content.is_empty() {
            return None;
        }
        if self.is_confident() {
            Some(content.to_string())
        } else {
            Some(LOW_CONFIDENCE_PLACEHOLDER.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueCurrency {
    amount: Option<serde_json::Number>,
    currency_code: Option<String>,
}

/// Map a completed analysis to extracted fields, applying the confidence
/// threshold. `VendorAddressRecipient` backs up a missing `VendorName`.
pub(crate) fn fields_from_result(result: &AnalyzeResult) -> Result<ExtractedFields, ExtractionError> {
    let document = result
        .documents
        .as_ref()
        .and_then(|docs| docs.first())
        .ok_or(ExtractionError::NoInvoice)?;
    let fields = &document.fields;

    let invoice_date = fields
        .get("InvoiceDate")
        .filter(|f| f.is_confident())
        .and_then(|f| f.value_date.as_deref())
        .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());

    let invoice_identifier = fields.get("InvoiceId").and_then(FieldValue::trusted_content);

    let total = fields.get("InvoiceTotal").filter(|f| f.is_confident());
    let total_amount = total
        .and_then(|f| f.value_currency.as_ref())
        .and_then(|vc| vc.amount.as_ref())
        .and_then(|n| BigDecimal::from_str(&n.to_string()).ok());
    let currency_code = total
        .and_then(|f| f.value_currency.as_ref())
        .and_then(|vc| vc.currency_code.as_deref())
        .filter(|code| !code.is_empty())
        .map(|code| code.to_ascii_uppercase());

    let vendor_name = fields
        .get("VendorName")
        .and_then(FieldValue::trusted_content)
        .or_else(|| {
            fields
                .get("VendorAddressRecipient")
                .and_then(FieldValue::trusted_content)
        });

    Ok(ExtractedFields {
        invoice_date,
        invoice_identifier,
        total_amount,
        currency_code,
        vendor_name,
    })
}

/// HTTP client for the document-intelligence analyze endpoint.
pub struct DocumentIntelligenceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model_id: String,
}

impl DocumentIntelligenceClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model_id: model_id.into(),
        }
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version=2024-11-30",
            self.endpoint, self.model_id
        )
    }

    async fn poll_operation(&self, operation_url: &str) -> Result<AnalyzeResult, ExtractionError> {
        for _ in 0..MAX_POLLS {
            let response = self
                .http
                .get(operation_url)
                .header("Ocp-Apim-Subscription-Key", &self.api_key)
                .send()
                .await
                .map_err(|e| ExtractionError::Http(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ExtractionError::Http(format!("poll returned status {status}")));
            }

            let operation: AnalyzeOperation = response
                .json()
                .await
                .map_err(|e| ExtractionError::Parse(e.to_string()))?;

            match operation.status.as_str() {
                "succeeded" => {
                    return operation
                        .analyze_result
                        .ok_or_else(|| ExtractionError::Parse("missing analyzeResult".into()));
                },
                "failed" => {
                    let detail = operation
                        .error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    return Err(ExtractionError::Analysis(detail));
                },
                _ => tokio::time::sleep(POLL_INTERVAL).await,
            }
        }
        Err(ExtractionError::Timeout)
    }
}

#[async_trait]
impl FieldExtractor for DocumentIntelligenceClient {
    async fn extract(&self, bytes: &[u8], mime: &str) -> Result<ExtractedFields, ExtractionError> {
        debug!(size = bytes.len(), mime, "submitting document for analysis");

        let response = self
            .http
            .post(self.analyze_url())
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Content-Type", mime)
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| ExtractionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Http(format!("analyze returned status {status}")));
        }

        let operation_url = response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ExtractionError::Parse("missing Operation-Location header".into()))?
            .to_string();

        let result = self.poll_operation(&operation_url).await?;
        fields_from_result(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_from(value: serde_json::Value) -> AnalyzeResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_confident_fields_are_kept() {
        let result = result_from(json!({
            "documents": [{
                "fields": {
                    "InvoiceDate": {"valueDate": "2024-01-05", "confidence": 0.95},
                    "InvoiceId": {"content": "INV-2023-00057", "confidence": 0.9},
                    "InvoiceTotal": {
                        "valueCurrency": {"amount": 100.0, "currencyCode": "eur"},
                        "content": "EUR 100.00",
                        "confidence": 0.88
                    },
                    "VendorName": {"content": "Acme GmbH", "confidence": 0.8}
                }
            }]
        }));

        let fields = fields_from_result(&result).unwrap();
        assert_eq!(
            fields.invoice_date,
            Some(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert_eq!(fields.invoice_identifier.as_deref(), Some("INV-2023-00057"));
        assert_eq!(fields.total_amount, Some(BigDecimal::from_str("100.0").unwrap()));
        assert_eq!(fields.currency_code.as_deref(), Some("EUR"));
        assert_eq!(fields.vendor_name.as_deref(), Some("Acme GmbH"));
    }

    #[test]
    fn test_low_confidence_text_becomes_sentinel() {
        let result = result_from(json!({
            "documents": [{
                "fields": {
                    "InvoiceId": {"content": "INV-1", "confidence": 0.2},
                    "VendorName": {"content": "Acme", "confidence": 0.4}
                }
            }]
        }));

        let fields = fields_from_result(&result).unwrap();
        assert_eq!(
            fields.invoice_identifier.as_deref(),
            Some(LOW_CONFIDENCE_PLACEHOLDER)
        );
        // Exactly at the threshold does not qualify
        assert_eq!(fields.vendor_name.as_deref(), Some(LOW_CONFIDENCE_PLACEHOLDER));
    }

    #[test]
    fn test_low_confidence_date_and_amount_are_dropped() {
        let result = result_from(json!({
            "documents": [{
                "fields": {
                    "InvoiceDate": {"valueDate": "2024-01-05", "confidence": 0.1},
                    "InvoiceTotal": {
                        "valueCurrency": {"amount": 100.0, "currencyCode": "EUR"},
                        "confidence": 0.3
                    }
                }
            }]
        }));

        let fields = fields_from_result(&result).unwrap();
        assert!(fields.invoice_date.is_none());
        assert!(fields.total_amount.is_none());
        assert!(fields.currency_code.is_none());
    }

    #[test]
    fn test_vendor_address_recipient_fallback() {
        let result = result_from(json!({
            "documents": [{
                "fields": {
                    "VendorAddressRecipient": {"content": "Acme Ltd", "confidence": 0.9}
                }
            }]
        }));

        let fields = fields_from_result(&result).unwrap();
        assert_eq!(fields.vendor_name.as_deref(), Some("Acme Ltd"));
    }

    #[test]
    fn test_no_documents_is_no_invoice() {
        let result = result_from(json!({"documents": []}));
        assert!(matches!(
            fields_from_result(&result),
            Err(ExtractionError::NoInvoice)
        ));
    }
}
