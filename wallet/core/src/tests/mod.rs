//!
//! Utilities and helpers for unit and integration testing.
//!

pub use chain::*;

mod draft;
