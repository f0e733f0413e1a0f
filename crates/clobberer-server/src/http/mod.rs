//! HTTP gateway for the clobberer API.
//!
//! A thin axum layer: it parses query strings and JSON bodies, resolves the
//! requester from a trusted header, and hands everything to the engine.

mod error;
mod identity;
pub mod routes;

use axum::Router;
use axum::http::HeaderName;
use axum::http::header::InvalidHeaderName;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::engine::ClobberEngine;

pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: ClobberEngine,
    /// Header holding the authenticated requester, set by the fronting proxy.
    pub identity_header: HeaderName,
}

impl AppState {
    pub fn new(engine: ClobberEngine, identity_header: &str) -> Result<Self, InvalidHeaderName> {
        Ok(Self {
            engine,
            identity_header: HeaderName::from_bytes(identity_header.as_bytes())?,
        })
    }
}

/// Build the API router mounted under `mount_prefix` (e.g. `/clobberer`).
pub fn build_router(state: AppState, mount_prefix: &str) -> Router {
    let api = Router::new()
        .route("/clobber", post(routes::clobber))
        .route("/lastclobber", get(routes::lastclobber))
        .route(
            "/lastclobber/branch/by-builder/{branch}",
            get(routes::lastclobber_by_builder),
        )
        .route("/forceclobber", get(routes::forceclobber))
        .route("/branches", get(routes::branches))
        .route("/builds", post(routes::register_build))
        .route("/health", get(routes::health))
        .with_state(state);

    let prefix = mount_prefix.trim_matches('/');
    let router = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{prefix}"), api)
    };
    router.layer(TraceLayer::new_for_http())
}
