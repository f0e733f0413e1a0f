//! Data models for Clobberer storage.

use serde::{Deserialize, Serialize};

/// Identity of a build: the `(branch, builddir, buildername)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildKey {
    pub branch: String,
    pub builddir: String,
    pub buildername: String,
}

impl BuildKey {
    pub fn new(
        branch: impl Into<String>,
        builddir: impl Into<String>,
        buildername: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            builddir: builddir.into(),
            buildername: buildername.into(),
        }
    }
}

/// A clobberable build.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Build {
    pub id: i64,
    pub branch: String,
    pub builddir: String,
    pub buildername: String,
    pub last_build_time: i64,
}

/// A recorded clobber request. `slave == None` applies to every slave.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ClobberTime {
    pub id: i64,
    pub build_id: i64,
    pub slave: Option<String>,
    pub lastclobber: i64,
    pub who: String,
}
