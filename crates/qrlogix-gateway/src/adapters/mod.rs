//! Adapters for the gateway.
//!
//! Conversions from infrastructure and tracking errors into HTTP errors.

pub mod error_conversions;
