//! Factura Common Library
//!
//! Shared types and utilities for the factura workspace:
//!
//! - **Logging**: Centralized tracing initialization for all binaries
//! - **Currency**: ISO 4217 code validation and normalization
//! - **Money**: Decimal arithmetic and the half-up rounding rule used by
//!   the conversion pipeline

pub mod currency;
pub mod error;
pub mod logging;
pub mod money;

// Re-export commonly used types
pub use error::{CommonError, Result};
