//! The per-file stage sequence
//!
//! validate -> extract -> decide-conversion -> lookup-rate -> convert.
//! Accumulation (processed counter, progress snapshot) is the
//! orchestrator's own step after a file resolves.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, warn};

use async_trait::async_trait;
use factura_common::money;

use crate::adapters::{FieldExtractor, RateLookup};
use crate::store::FileStatus;

use super::breaker::CircuitBreaker;
use super::context::{FileContext, Stage, StageOutcome};

/// Error message stored on files skipped because the breaker is open.
pub const BREAKER_OPEN_MESSAGE: &str = "currency service unavailable";

/// Rejects documents that cannot possibly be analyzed.
pub struct ValidateStage;

#[async_trait]
impl Stage for ValidateStage {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn process(&self, ctx: &mut FileContext) -> StageOutcome {
        if ctx.bytes.is_empty() {
            ctx.record.mark_failed("file is empty");
            return StageOutcome::Resolved;
        }
        StageOutcome::Continue
    }
}

/// Runs the document through the field-extraction service.
pub struct ExtractStage {
    extractor: Arc<dyn FieldExtractor>,
}

impl ExtractStage {
    pub fn new(extractor: Arc<dyn FieldExtractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> &'static str {
        "extract"
    }

    async fn process(&self, ctx: &mut FileContext) -> StageOutcome {
        ctx.record.status = FileStatus::Extracting;

        let fields = match self.extractor.extract(&ctx.bytes, &ctx.mime_type).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(filename = %ctx.record.filename, error = %e, "extraction failed");
                ctx.record.mark_failed(format!("extraction failed: {e}"));
                return StageOutcome::Resolved;
            },
        };

        ctx.record.invoice_date = fields.invoice_date;
        ctx.record.invoice_identifier = fields.invoice_identifier;
        ctx.record.total_amount = fields.total_amount;
        ctx.record.original_currency = fields.currency_code;
        ctx.record.vendor_name = fields.vendor_name;

        // A document without a recognizable total or currency cannot be
        // converted; date absence alone is fine.
        if ctx.record.total_amount.is_none() || ctx.record.original_currency.is_none() {
            ctx.record.mark_failed("no total amount or currency recognized");
            return StageOutcome::Resolved;
        }

        StageOutcome::Continue
    }
}

/// Decides whether a rate lookup is needed at all.
pub struct CurrencyDecisionStage;

#[async_trait]
impl Stage for CurrencyDecisionStage {
    fn name(&self) -> &'static str {
        "decide-conversion"
    }

    async fn process(&self, ctx: &mut FileContext) -> StageOutcome {
        if ctx.record.original_currency.as_deref() == Some(ctx.target_currency.as_str()) {
            // Same-currency shortcut: no lookup, no breaker involvement,
            // and no exchange rate on the record.
            ctx.record.converted_amount = ctx.record.total_amount.clone();
            ctx.record.exchange_rate = None;
            ctx.record.status = FileStatus::Success;
            return StageOutcome::Resolved;
        }
        ctx.record.status = FileStatus::RatePending;
        StageOutcome::Continue
    }
}

/// Fetches the exchange rate, guarded by the per-run circuit breaker.
pub struct RateLookupStage {
    rates: Arc<dyn RateLookup>,
    breaker: Mutex<CircuitBreaker>,
    timeout: Duration,
}

impl RateLookupStage {
    pub fn new(rates: Arc<dyn RateLookup>, breaker: CircuitBreaker, timeout: Duration) -> Self {
        Self {
            rates,
            breaker: Mutex::new(breaker),
            timeout,
        }
    }
}

#[async_trait]
impl Stage for RateLookupStage {
    fn name(&self) -> &'static str {
        "lookup-rate"
    }

    async fn process(&self, ctx: &mut FileContext) -> StageOutcome {
        if self.breaker.lock().unwrap().is_tripped() {
            ctx.record.mark_failed(BREAKER_OPEN_MESSAGE);
            return StageOutcome::Resolved;
        }

        let from = match ctx.record.original_currency.as_deref() {
            Some(code) => code.to_string(),
            None => {
                ctx.record.mark_failed("no source currency for rate lookup");
                return StageOutcome::Resolved;
            },
        };

        // A missing invoice date is not a blocker; the adapter falls back
        // to the latest available rate.
        let result = self
            .rates
            .lookup(ctx.record.invoice_date, &from, &ctx.target_currency, self.timeout)
            .await;

        match result {
            Ok(rate) => {
                self.breaker.lock().unwrap().record_success();
                ctx.record.exchange_rate = Some(money::round_half_up(&rate, money::RATE_SCALE));
                ctx.record.status = FileStatus::Converting;
                StageOutcome::Continue
            },
            Err(e) => {
                let tripped = self.breaker.lock().unwrap().record_failure();
                if tripped {
                    warn!(job_id = %ctx.record.job_id, "circuit breaker tripped: {e}");
                } else {
                    debug!(filename = %ctx.record.filename, "rate lookup failed: {e}");
                }
                ctx.record.mark_failed(format!("rate lookup failed: {e}"));
                StageOutcome::Resolved
            },
        }
    }
}

/// Applies the exchange rate with the half-up rounding rule.
pub struct ConvertStage;

#[async_trait]
impl Stage for ConvertStage {
    fn name(&self) -> &'static str {
        "convert"
    }

    async fn process(&self, ctx: &mut FileContext) -> StageOutcome {
        match (&ctx.record.total_amount, &ctx.record.exchange_rate) {
            (Some(total), Some(rate)) => {
                ctx.record.converted_amount = Some(money::convert_amount(total, rate));
                ctx.record.status = FileStatus::Success;
            },
            _ => ctx.record.mark_failed("conversion reached without amount and rate"),
        }
        StageOutcome::Resolved
    }
}

/// Build the stage sequence for one job run. The breaker is owned by the
/// rate-lookup stage and dies with it.
pub fn build_stages(
    extractor: Arc<dyn FieldExtractor>,
    rates: Arc<dyn RateLookup>,
    rate_timeout: Duration,
) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ValidateStage),
        Box::new(ExtractStage::new(extractor)),
        Box::new(CurrencyDecisionStage),
        Box::new(RateLookupStage::new(rates, CircuitBreaker::new(), rate_timeout)),
        Box::new(ConvertStage),
    ]
}
