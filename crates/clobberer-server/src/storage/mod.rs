//! `SQLite` storage for Clobberer.
//!
//! Provides persistence for builds and their clobber times. Query functions
//! take an explicit connection so the caller owns the transaction scope.

mod db;
mod models;
pub mod queries;


pub use db::{ClobberDatabase, DatabaseError};
pub use models::*;
