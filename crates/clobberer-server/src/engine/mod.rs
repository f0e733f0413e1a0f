//! Clobber-time resolution engine.
//!
//! Every operation runs inside a single transaction that is handed to the
//! storage layer explicitly. Writing operations take the write lock up front.
//! Callers supply the current time and requester.

mod types;
pub mod validate;


use std::collections::BTreeMap;

use clobberer_core::naming::is_release_builddir;
use tracing::{debug, info, warn};

use crate::storage::{queries, Build, BuildKey, ClobberDatabase, DatabaseError};

pub use types::{
    ClobberOutcome, ClobberRequest, ClobberSummary, ForcedClobber, LastClobber, Requester,
    FORCE_CLOBBER_MARKER, FORCE_CLOBBER_OFFSET_SECS,
};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.into())
    }
}

#[derive(Clone)]
pub struct ClobberEngine {
    db: ClobberDatabase,
}

impl ClobberEngine {
    pub const fn new(db: ClobberDatabase) -> Self {
        Self { db }
    }

    pub const fn database(&self) -> &ClobberDatabase {
        &self.db
    }

    /// Record a batch of clobber requests.
    ///
    /// Items targeting a release builddir are skipped. Every other item must
    /// name a build that has already been seen. The batch commits as a whole:
    /// one unknown build fails the request and nothing is written.
    pub async fn record_clobber(
        &self,
        batch: &[ClobberRequest],
        who: &Requester,
        now: i64,
    ) -> Result<ClobberOutcome, EngineError> {
        validate::field("who", who.as_str(), validate::MAX_WHO_LEN)?;
        for item in batch {
            validate::build_key(&item.build)?;
            validate::slave(item.slave())?;
        }

        let mut outcome = ClobberOutcome::default();
        let mut tx = self.db.begin_write().await?;

        for item in batch {
            let key = &item.build;
            if is_release_builddir(&key.builddir) {
                debug!(
                    builddir = %key.builddir,
                    "Rejecting clobber of builddir with release prefix"
                );
                outcome.skipped += 1;
                continue;
            }

            let build = queries::find_build(&mut *tx, key).await.inspect_err(|e| {
                warn!(
                    branch = %key.branch,
                    builddir = %key.builddir,
                    buildername = %key.buildername,
                    error = %e,
                    "Clobber batch references unknown build"
                );
            })?;
            let clobber_time =
                queries::find_or_create_clobber_time(&mut *tx, build.id, item.slave(), now).await?;
            queries::set_clobber(&mut *tx, clobber_time.id, now, who.as_str()).await?;

            info!(
                build_id = build.id,
                builddir = %key.builddir,
                slave = item.slave().unwrap_or("*"),
                who = %who,
                "Clobber recorded"
            );
            outcome.recorded += 1;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    /// Resolve the clobber time a slave should act on, registering the build
    /// as seen.
    ///
    /// The build's `last_build_time` is rewritten on every call, even when
    /// nothing has been clobbered.
    pub async fn lookup(
        &self,
        key: &BuildKey,
        slave: Option<&str>,
        now: i64,
    ) -> Result<Option<LastClobber>, EngineError> {
        validate::build_key(key)?;
        let slave = slave.filter(|s| !s.is_empty());
        validate::slave(slave)?;

        let mut tx = self.db.begin_write().await?;
        let build = queries::find_or_create_build(&mut *tx, key, now).await?;
        queries::touch_build(&mut *tx, build.id, now).await?;
        let latest = queries::latest_clobber_for(&mut *tx, build.id, slave).await?;
        tx.commit().await?;

        debug!(
            build_id = build.id,
            slave = slave.unwrap_or("*"),
            found = latest.is_some(),
            "Clobber lookup"
        );

        Ok(latest.map(|ct| LastClobber {
            builddir: build.builddir,
            lastclobber: ct.lastclobber,
            who: ct.who,
        }))
    }

    /// Branches with at least one non-release builddir, ascending.
    pub async fn list_branches(&self) -> Result<Vec<String>, EngineError> {
        let mut conn = self.db.pool().acquire().await?;
        Ok(queries::list_branches(&mut *conn).await?)
    }

    /// Latest clobber of every non-release build on `branch`, grouped by
    /// buildername.
    pub async fn last_clobber_by_builder(
        &self,
        branch: &str,
    ) -> Result<BTreeMap<String, Vec<ClobberSummary>>, EngineError> {
        let mut tx = self.db.pool().begin().await?;
        let builds = queries::builds_on_branch(&mut *tx, branch).await?;

        let mut summary: BTreeMap<String, Vec<ClobberSummary>> = BTreeMap::new();
        for build in builds {
            let max = queries::max_clobber_time(&mut *tx, build.id).await?;
            let (lastclobber, who) =
                max.map_or((None, None), |ct| (Some(ct.lastclobber), Some(ct.who)));
            summary
                .entry(build.buildername.clone())
                .or_default()
                .push(ClobberSummary {
                    branch: build.branch,
                    builddir: build.builddir,
                    buildername: build.buildername,
                    lastclobber,
                    who,
                });
        }
        tx.commit().await?;

        Ok(summary)
    }

    /// Explicitly register a build without looking up its clobber time.
    pub async fn register_build(&self, key: &BuildKey, now: i64) -> Result<Build, EngineError> {
        validate::build_key(key)?;

        let mut tx = self.db.begin_write().await?;
        let build = queries::find_or_create_build(&mut *tx, key, now).await?;
        tx.commit().await?;

        info!(
            build_id = build.id,
            branch = %key.branch,
            builddir = %key.builddir,
            "Build registered"
        );
        Ok(build)
    }

    /// Claim a clobber one hour in the future so the client always wipes
    /// `builddir`. Touches no storage.
    pub fn force_clobber(builddir: &str, now: i64) -> ForcedClobber {
        ForcedClobber {
            builddir: builddir.to_string(),
            timestamp: now + FORCE_CLOBBER_OFFSET_SECS,
        }
    }
}
