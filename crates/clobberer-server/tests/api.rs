use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use clobberer_core::db::unix_timestamp;
use clobberer_server::engine::ClobberEngine;
use clobberer_server::http::{build_router, AppState};
use clobberer_server::storage::ClobberDatabase;

const IDENTITY_HEADER: &str = "x-authenticated-email";

async fn app() -> (axum::Router, ClobberDatabase) {
    let db = ClobberDatabase::open_in_memory().await.unwrap();
    let state = AppState::new(ClobberEngine::new(db.clone()), IDENTITY_HEADER).unwrap();
    (build_router(state, "/clobberer"), db)
}

/// Send a GET request and return (status, body text).
async fn get(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let resp = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

/// POST a JSON body, optionally as an authenticated user.
async fn post_json(
    app: &axum::Router,
    uri: &str,
    body: &Value,
    identity: Option<&str>,
) -> (StatusCode, String) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(who) = identity {
        builder = builder.header(IDENTITY_HEADER, who);
    }
    let resp = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&body).into_owned())
}

fn clobber_args() -> Value {
    json!({"branch": "branch", "builddir": "builddir", "buildername": "buildername"})
}

fn clobber_args_with_slave() -> Value {
    json!({
        "branch": "other_branch",
        "builddir": "other_builddir",
        "buildername": "other_buildername",
        "slave": "specific-slave"
    })
}

const LOOKUP: &str =
    "/clobberer/lastclobber?branch=branch&builddir=builddir&buildername=buildername";
const LOOKUP_WITH_SLAVE: &str = "/clobberer/lastclobber?branch=other_branch&builddir=other_builddir&buildername=other_buildername&slave=specific-slave";

#[tokio::test]
async fn clobber_request_without_builds_fails() {
    let (app, db) = app().await;
    let (status, _) = post_json(
        &app,
        "/clobberer/clobber",
        &json!([clobber_args(), clobber_args_with_slave()]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(db.count_clobber_times().await.unwrap(), 0);
}

#[tokio::test]
async fn lastclobber_makes_build() {
    let (app, db) = app().await;
    let (status, text) = get(&app, LOOKUP).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "");
    assert_eq!(db.count_builds().await.unwrap(), 1);
}

#[tokio::test]
async fn clobber_then_lastclobber_round_trip() {
    let (app, db) = app().await;
    get(&app, LOOKUP).await;

    let before = unix_timestamp();
    let (status, text) =
        post_json(&app, "/clobberer/clobber", &json!([clobber_args()]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!({"result": null}));
    assert_eq!(db.count_clobber_times().await.unwrap(), 1);

    let (status, text) = get(&app, LOOKUP).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.ends_with('\n'));
    let fields: Vec<&str> = text.trim_end().split(':').collect();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0], "builddir");
    let ts: i64 = fields[1].parse().unwrap();
    assert!((before..=unix_timestamp()).contains(&ts));
    assert_eq!(fields[2], "anonymous");
}

#[tokio::test]
async fn clobber_records_authenticated_requester() {
    let (app, _db) = app().await;
    get(&app, LOOKUP).await;

    let (status, _) = post_json(
        &app,
        "/clobberer/clobber",
        &json!([clobber_args()]),
        Some("dev@example.com"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, text) = get(&app, LOOKUP).await;
    assert!(text.trim_end().ends_with(":dev@example.com"), "got {text:?}");
}

#[tokio::test]
async fn clobber_with_slave_only_visible_to_that_slave() {
    let (app, db) = app().await;
    let (_, text) = get(&app, LOOKUP_WITH_SLAVE).await;
    assert_eq!(text, "");

    let (status, _) = post_json(
        &app,
        "/clobberer/clobber",
        &json!([clobber_args_with_slave()]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.count_clobber_times().await.unwrap(), 1);

    let (_, text) = get(&app, LOOKUP_WITH_SLAVE).await;
    let fields: Vec<&str> = text.trim_end().split(':').collect();
    assert_eq!(fields[0], "other_builddir");
    assert!(fields[1].parse::<i64>().is_ok());

    let (status, text) = get(
        &app,
        "/clobberer/lastclobber?branch=other_branch&builddir=other_builddir&buildername=other_buildername&slave=does-not-exist",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "");
}

#[tokio::test]
async fn empty_lastclobber_is_graceful() {
    let (app, _db) = app().await;
    let (status, text) = get(&app, "/clobberer/lastclobber?branch=fake&builddir=bogus").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "");
}

#[tokio::test]
async fn lastclobber_requires_branch_and_builddir() {
    let (app, _db) = app().await;
    let (status, text) = get(&app, "/clobberer/lastclobber?builddir=bogus").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(text.contains("branch"));

    let (status, _) = get(&app, "/clobberer/lastclobber?branch=fake").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn colon_in_field_is_rejected() {
    let (app, db) = app().await;
    let (status, _) = get(&app, "/clobberer/lastclobber?branch=b&builddir=a%3Ab").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(db.count_builds().await.unwrap(), 0);
}

#[tokio::test]
async fn lastclobber_by_builder_lists_builds() {
    let (app, _db) = app().await;
    get(&app, LOOKUP).await;
    post_json(&app, "/clobberer/clobber", &json!([clobber_args()]), None).await;

    let (status, text) = get(&app, "/clobberer/lastclobber/branch/by-builder/branch").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    let entries = body["result"]["buildername"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["branch"], "branch");
    assert_eq!(entries[0]["builddir"], "builddir");
    assert_eq!(entries[0]["who"], "anonymous");
    assert!(entries[0]["lastclobber"].is_i64());
}

#[tokio::test]
async fn release_builders_are_hidden() {
    let (app, _db) = app().await;
    post_json(
        &app,
        "/clobberer/builds",
        &json!({"branch": "branch", "builddir": "test", "buildername": "release-test"}),
        None,
    )
    .await;

    let (status, text) = get(&app, "/clobberer/lastclobber/branch/by-builder/branch").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert!(body["result"].get("release-test").is_none());
}

#[tokio::test]
async fn forceclobber_is_in_the_future() {
    let (app, _db) = app().await;
    let (status, text) = get(&app, "/clobberer/forceclobber?builddir=lamesauce").await;
    assert_eq!(status, StatusCode::OK);

    let fields: Vec<&str> = text.split(':').collect();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0], "lamesauce");
    assert_eq!(fields[2], "forceclobber");
    let ts: i64 = fields[1].parse().unwrap();
    assert!(ts > unix_timestamp() + 3598);
}

#[tokio::test]
async fn branches_are_sorted_and_distinct() {
    let (app, _db) = app().await;
    get(&app, LOOKUP).await;
    get(&app, "/clobberer/lastclobber?branch=fake&builddir=bogus").await;
    get(&app, LOOKUP_WITH_SLAVE).await;
    get(&app, "/clobberer/lastclobber?branch=branch&builddir=second&buildername=x").await;

    let (status, text) = get(&app, "/clobberer/branches").await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["result"], json!(["branch", "fake", "other_branch"]));
}

#[tokio::test]
async fn release_branches_are_hidden() {
    let (app, _db) = app().await;
    post_json(
        &app,
        "/clobberer/builds",
        &json!({"branch": "see-no-evil", "builddir": "rel-builddir", "buildername": ""}),
        None,
    )
    .await;

    let (_, text) = get(&app, "/clobberer/branches").await;
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["result"], json!([]));
}

#[tokio::test]
async fn clobber_of_release_is_ignored() {
    let (app, db) = app().await;
    let evil = json!({"branch": "none", "builddir": "rel-directory", "buildername": "buildername"});
    post_json(&app, "/clobberer/builds", &evil, None).await;

    let (status, _) = post_json(&app, "/clobberer/clobber", &json!([evil]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.count_clobber_times().await.unwrap(), 0);
}

#[tokio::test]
async fn clobber_of_lookalike_release_is_recorded() {
    let (app, db) = app().await;
    let tricky = json!({
        "branch": "none",
        "builddir": "directory-rel-tricky",
        "buildername": "buildername"
    });
    post_json(&app, "/clobberer/builds", &tricky, None).await;

    let (status, _) = post_json(&app, "/clobberer/clobber", &json!([tricky]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(db.count_clobber_times().await.unwrap(), 1);
}

#[tokio::test]
async fn register_build_returns_row() {
    let (app, db) = app().await;
    let (status, text) = post_json(&app, "/clobberer/builds", &clobber_args(), None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["result"]["builddir"], "builddir");
    assert!(body["result"]["id"].is_i64());

    post_json(&app, "/clobberer/builds", &clobber_args(), None).await;
    assert_eq!(db.count_builds().await.unwrap(), 1);
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _db) = app().await;
    let (status, text) = get(&app, "/clobberer/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "ok");
}

#[tokio::test]
async fn root_mount_serves_unprefixed_paths() {
    let db = ClobberDatabase::open_in_memory().await.unwrap();
    let state = AppState::new(ClobberEngine::new(db), IDENTITY_HEADER).unwrap();
    let app = build_router(state, "/");

    let (status, _) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = get(&app, "/clobberer/health").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
