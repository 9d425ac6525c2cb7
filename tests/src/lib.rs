//! # QRLogix Test Suite
//!
//! End-to-end flows driven through the HTTP router, backed by the in-memory
//! repository and a manual clock.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs     # TestApp: router + repository + clock
//!     ├── scan_flow.rs   # /scan, cookies, cycle completion and discard
//!     ├── supervision.rs # /ciclos, /ciclos/accion, /tablero, /metrics
//!     ├── devices.rs     # /registro_dispositivo, plate whitelist
//!     └── report.rs      # /descargar_informe
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qrlogix-tests
//! cargo test -p qrlogix-tests integration::scan_flow::
//! ```

#![allow(dead_code)]

pub mod integration;
