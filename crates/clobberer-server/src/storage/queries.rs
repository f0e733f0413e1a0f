//! Database queries for Clobberer.
//!
//! Every function runs on a caller-supplied connection, normally a
//! transaction opened by the resolution engine.

use clobberer_core::naming::{ANONYMOUS, BUILDDIR_REL_PREFIX, BUILDER_REL_PREFIX};
use sqlx::SqliteConnection;

use super::db::DatabaseError;
use super::models::{Build, BuildKey, ClobberTime};

// =========================================================================
// Build queries
// =========================================================================

/// Find the build for `key`, creating it with `last_build_time = now` if it
/// does not exist yet.
///
/// A concurrent insert of the same triple is absorbed by the unique index;
/// the follow-up select then returns whichever row won.
pub async fn find_or_create_build(
    conn: &mut SqliteConnection,
    key: &BuildKey,
    now: i64,
) -> Result<Build, DatabaseError> {
    sqlx::query(
        "INSERT INTO builds (branch, builddir, buildername, last_build_time) VALUES (?, ?, ?, ?) \
         ON CONFLICT(branch, builddir, buildername) DO NOTHING",
    )
    .bind(&key.branch)
    .bind(&key.builddir)
    .bind(&key.buildername)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    find_build(conn, key).await
}

/// Get the build matching `key` exactly.
pub async fn find_build(conn: &mut SqliteConnection, key: &BuildKey) -> Result<Build, DatabaseError> {
    sqlx::query_as::<_, Build>(
        "SELECT * FROM builds WHERE branch = ? AND builddir = ? AND buildername = ?",
    )
    .bind(&key.branch)
    .bind(&key.builddir)
    .bind(&key.buildername)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        DatabaseError::NotFound(format!(
            "Build {}/{}/{}",
            key.branch, key.builddir, key.buildername
        ))
    })
}

/// Record that a build was just seen.
pub async fn touch_build(
    conn: &mut SqliteConnection,
    build_id: i64,
    now: i64,
) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE builds SET last_build_time = ? WHERE id = ?")
        .bind(now)
        .bind(build_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!("Build {build_id}")));
    }
    Ok(())
}

/// Distinct branches that have at least one non-release builddir, ascending.
pub async fn list_branches(conn: &mut SqliteConnection) -> Result<Vec<String>, DatabaseError> {
    let branches: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT branch FROM builds \
         WHERE substr(builddir, 1, length(?)) <> ? \
         ORDER BY branch ASC",
    )
    .bind(BUILDDIR_REL_PREFIX)
    .bind(BUILDDIR_REL_PREFIX)
    .fetch_all(&mut *conn)
    .await?;

    Ok(branches)
}

/// Builds on `branch` excluding release builders, ordered by buildername
/// then builddir.
pub async fn builds_on_branch(
    conn: &mut SqliteConnection,
    branch: &str,
) -> Result<Vec<Build>, DatabaseError> {
    let builds = sqlx::query_as::<_, Build>(
        "SELECT * FROM builds \
         WHERE branch = ? AND substr(buildername, 1, length(?)) <> ? \
         ORDER BY buildername ASC, builddir ASC, id ASC",
    )
    .bind(branch)
    .bind(BUILDER_REL_PREFIX)
    .bind(BUILDER_REL_PREFIX)
    .fetch_all(&mut *conn)
    .await?;

    Ok(builds)
}

// =========================================================================
// Clobber time queries
// =========================================================================

/// Find the clobber time for `(build_id, slave)`, creating it with
/// `lastclobber = now` if absent. `slave == None` is the wildcard row.
pub async fn find_or_create_clobber_time(
    conn: &mut SqliteConnection,
    build_id: i64,
    slave: Option<&str>,
    now: i64,
) -> Result<ClobberTime, DatabaseError> {
    sqlx::query(
        "INSERT INTO clobber_times (build_id, slave, lastclobber, who) VALUES (?, ?, ?, ?) \
         ON CONFLICT DO NOTHING",
    )
    .bind(build_id)
    .bind(slave)
    .bind(now)
    .bind(ANONYMOUS)
    .execute(&mut *conn)
    .await?;

    // `IS` compares NULL to NULL as equal.
    sqlx::query_as::<_, ClobberTime>(
        "SELECT * FROM clobber_times WHERE build_id = ? AND slave IS ?",
    )
    .bind(build_id)
    .bind(slave)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| {
        DatabaseError::NotFound(format!(
            "ClobberTime for build {build_id} slave {}",
            slave.unwrap_or("*")
        ))
    })
}

/// Stamp a clobber time with a new clobber moment and requester.
pub async fn set_clobber(
    conn: &mut SqliteConnection,
    clobber_time_id: i64,
    lastclobber: i64,
    who: &str,
) -> Result<(), DatabaseError> {
    let result = sqlx::query("UPDATE clobber_times SET lastclobber = ?, who = ? WHERE id = ?")
        .bind(lastclobber)
        .bind(who)
        .bind(clobber_time_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!(
            "ClobberTime {clobber_time_id}"
        )));
    }
    Ok(())
}

/// Most recent clobber time that applies to `slave` on a build: either the
/// slave's own row or the wildcard row. Equal timestamps prefer the newer row.
pub async fn latest_clobber_for(
    conn: &mut SqliteConnection,
    build_id: i64,
    slave: Option<&str>,
) -> Result<Option<ClobberTime>, DatabaseError> {
    let clobber_time = sqlx::query_as::<_, ClobberTime>(
        "SELECT * FROM clobber_times \
         WHERE build_id = ? AND (slave = ? OR slave IS NULL) \
         ORDER BY lastclobber DESC, id DESC LIMIT 1",
    )
    .bind(build_id)
    .bind(slave)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(clobber_time)
}

/// Most recent clobber time on a build regardless of slave.
pub async fn max_clobber_time(
    conn: &mut SqliteConnection,
    build_id: i64,
) -> Result<Option<ClobberTime>, DatabaseError> {
    let clobber_time = sqlx::query_as::<_, ClobberTime>(
        "SELECT * FROM clobber_times WHERE build_id = ? \
         ORDER BY lastclobber DESC, id DESC LIMIT 1",
    )
    .bind(build_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(clobber_time)
}
