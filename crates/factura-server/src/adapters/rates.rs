//! Exchange-rate lookup adapter
//!
//! Client for a Frankfurter-style rate API: `GET {base}/{date}?from=X&to=Y`
//! where `{date}` is `YYYY-MM-DD` or `latest`. The adapter is stateless;
//! failure counting lives in the pipeline's per-run circuit breaker, never
//! here, so unrelated jobs can't poison each other.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Failure kinds for a rate lookup. All of them count toward the breaker.
#[derive(Debug, Error)]
pub enum RateLookupError {
    #[error("rate lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate service request failed: {0}")]
    Http(String),

    #[error("unexpected rate service response: {0}")]
    Parse(String),
}

/// Rate-lookup boundary. `date == None` means "latest available rate".
#[async_trait]
pub trait RateLookup: Send + Sync {
    async fn lookup(
        &self,
        date: Option<NaiveDate>,
        from: &str,
        to: &str,
        timeout: Duration,
    ) -> Result<BigDecimal, RateLookupError>;
}

#[derive(Debug, Deserialize)]
struct RateResponse {
    rates: HashMap<String, serde_json::Number>,
}

/// HTTP client for the Frankfurter exchange-rate API.
pub struct FrankfurterClient {
    http: reqwest::Client,
    base_url: String,
}

impl FrankfurterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RateLookup for FrankfurterClient {
    async fn lookup(
        &self,
        date: Option<NaiveDate>,
        from: &str,
        to: &str,
        timeout: Duration,
    ) -> Result<BigDecimal, RateLookupError> {
        let from = from.to_ascii_uppercase();
        let to = to.to_ascii_uppercase();
        let day = match date {
            Some(d) => d.format("%Y-%m-%d").to_string(),
            None => "latest".to_string(),
        };
        let url = format!("{}/{}?from={}&to={}", self.base_url, day, from, to);
        debug!(%url, "looking up exchange rate");

        // One deadline covers the whole exchange: a service that answers
        // headers promptly but stalls the body must still count as a timeout.
        let body: RateResponse = tokio::time::timeout(timeout, async {
            let response = self.http.get(&url).send().await.map_err(|e| {
                if e.is_timeout() {
                    RateLookupError::Timeout(timeout)
                } else {
                    RateLookupError::Http(e.to_string())
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(RateLookupError::Http(format!(
                    "status {} for {} -> {} on {}",
                    status, from, to, day
                )));
            }

            response
                .json()
                .await
                .map_err(|e| RateLookupError::Parse(e.to_string()))
        })
        .await
        .map_err(|_| RateLookupError::Timeout(timeout))??;

        let rate = body
            .rates
            .get(&to)
            .ok_or_else(|| RateLookupError::Parse(format!("currency {to} missing from response")))?;

        BigDecimal::from_str(&rate.to_string())
            .map_err(|e| RateLookupError::Parse(format!("rate {rate} is not a decimal: {e}")))
    }
}
