//! Utility modules for the tasklane application.
//!
//! # Available Utilities
//!
//! - [`datetime`] - Human-readable formatting of sync timestamps

pub mod datetime;
