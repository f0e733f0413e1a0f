use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use clobberer_core::db::unix_timestamp;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::engine::{validate, ClobberEngine, ClobberRequest, ClobberSummary, Requester};
use crate::storage::{Build, BuildKey};

/// JSON envelope shared by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub result: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct LastClobberParams {
    pub branch: Option<String>,
    pub builddir: Option<String>,
    pub buildername: Option<String>,
    pub slave: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForceClobberParams {
    pub builddir: Option<String>,
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value.ok_or_else(|| ApiError::BadRequest(format!("Missing query parameter: {name}")))
}

/// `POST /clobber`: Request clobbers for a batch of builds.
pub async fn clobber(
    State(state): State<AppState>,
    requester: Requester,
    Json(body): Json<Vec<ClobberRequest>>,
) -> Result<Json<ApiResult<()>>, ApiError> {
    state
        .engine
        .record_clobber(&body, &requester, unix_timestamp())
        .await?;
    Ok(Json(ApiResult { result: () }))
}

/// `GET /lastclobber`: Plain-text `builddir:lastclobber:who` line, or an
/// empty body when the build was never clobbered.
pub async fn lastclobber(
    State(state): State<AppState>,
    Query(params): Query<LastClobberParams>,
) -> Result<String, ApiError> {
    let key = BuildKey {
        branch: required(params.branch, "branch")?,
        builddir: required(params.builddir, "builddir")?,
        buildername: params.buildername.unwrap_or_default(),
    };

    let found = state
        .engine
        .lookup(&key, params.slave.as_deref(), unix_timestamp())
        .await?;
    Ok(found.map(|lc| lc.to_string()).unwrap_or_default())
}

/// `GET /forceclobber`: Always reports a clobber in the future.
pub async fn forceclobber(Query(params): Query<ForceClobberParams>) -> Result<String, ApiError> {
    let builddir = required(params.builddir, "builddir")?;
    validate::field("builddir", &builddir, validate::MAX_BUILDDIR_LEN)?;
    Ok(ClobberEngine::force_clobber(&builddir, unix_timestamp()).to_string())
}

/// `GET /branches`
pub async fn branches(
    State(state): State<AppState>,
) -> Result<Json<ApiResult<Vec<String>>>, ApiError> {
    let result = state.engine.list_branches().await?;
    Ok(Json(ApiResult { result }))
}

/// `GET /lastclobber/branch/by-builder/{branch}`
pub async fn lastclobber_by_builder(
    State(state): State<AppState>,
    Path(branch): Path<String>,
) -> Result<Json<ApiResult<BTreeMap<String, Vec<ClobberSummary>>>>, ApiError> {
    let result = state.engine.last_clobber_by_builder(&branch).await?;
    Ok(Json(ApiResult { result }))
}

/// `POST /builds`: Register a build ahead of its first lookup.
pub async fn register_build(
    State(state): State<AppState>,
    Json(key): Json<BuildKey>,
) -> Result<Json<ApiResult<Build>>, ApiError> {
    let result = state.engine.register_build(&key, unix_timestamp()).await?;
    Ok(Json(ApiResult { result }))
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state
        .engine
        .database()
        .ping()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok("ok")
}
