//! Crash Analytics: streak statistics and martingale bet simulation over
//! crash game history.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod analytics;
pub mod config;
pub mod credentials;
pub mod history;
pub mod server;
pub mod storage;
pub mod types;
