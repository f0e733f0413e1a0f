//! Clobberer Server Library
//!
//! Core functionality for the clobberer service:
//! - `SQLite` storage for builds and clobber times
//! - Clobber-time resolution engine
//! - HTTP gateway (axum) exposing the engine to build clients

pub mod engine;
pub mod http;
pub mod storage;
