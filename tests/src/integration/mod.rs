//! Cross-crate HTTP flows.

pub mod support;

#[cfg(test)]
mod devices;
#[cfg(test)]
mod report;
#[cfg(test)]
mod scan_flow;
#[cfg(test)]
mod supervision;
