//! Cutforge Common Utilities
//!
//! Shared infrastructure for all Cutforge crates:
//! - Error types and result aliases
//! - Frame clock: millisecond ↔ frame conversion
//! - Tracing/logging initialization
//! - Worker configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
