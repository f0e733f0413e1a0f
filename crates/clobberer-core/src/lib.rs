//! Clobberer Core Library
//!
//! Shared functionality for Clobberer components:
//! - Configuration resolution and hierarchy
//! - `SQLite` pool helpers and the shared `DatabaseError`
//! - Release naming rules for builddirs and builders
//! - Common error types and tracing setup

pub mod config;
pub mod db;
pub mod error;
pub mod naming;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
