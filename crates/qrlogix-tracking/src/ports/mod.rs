//! Ports for the check-in service (hexagonal architecture).

pub mod outbound;

pub use outbound::{CheckinRepository, TimeSource};
