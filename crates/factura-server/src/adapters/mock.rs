//! Scripted adapter doubles for tests
//!
//! Queue up per-call results ahead of time; calls consume them in order.
//! Call counters let tests assert that shortcuts (same currency, tripped
//! breaker) really skip the external dependency.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use super::extraction::{ExtractedFields, ExtractionError, FieldExtractor};
use super::rates::{RateLookup, RateLookupError};

#[derive(Default)]
pub struct ScriptedExtractor {
    results: Mutex<VecDeque<Result<ExtractedFields, ExtractionError>>>,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: Result<ExtractedFields, ExtractionError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FieldExtractor for ScriptedExtractor {
    async fn extract(&self, _bytes: &[u8], _mime: &str) -> Result<ExtractedFields, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ExtractionError::NoInvoice))
    }
}

#[derive(Default)]
pub struct ScriptedRates {
    results: Mutex<VecDeque<Result<BigDecimal, RateLookupError>>>,
    calls: AtomicUsize,
}

impl ScriptedRates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, result: Result<BigDecimal, RateLookupError>) {
        self.results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLookup for ScriptedRates {
    async fn lookup(
        &self,
        _date: Option<NaiveDate>,
        _from: &str,
        _to: &str,
        _timeout: Duration,
    ) -> Result<BigDecimal, RateLookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(RateLookupError::Http("no scripted result".into())))
    }
}
