//! Request and response types of the resolution engine.

use std::fmt;

use clobberer_core::naming::ANONYMOUS;
use serde::{Deserialize, Serialize};

use crate::storage::BuildKey;

/// Marker carried in force-clobber responses in place of a requester.
pub const FORCE_CLOBBER_MARKER: &str = "forceclobber";

/// How far in the future a forced clobber claims to have happened.
pub const FORCE_CLOBBER_OFFSET_SECS: i64 = 3600;

/// One item of a clobber batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClobberRequest {
    #[serde(flatten)]
    pub build: BuildKey,
    /// Target slave; absent means every slave.
    #[serde(default)]
    pub slave: Option<String>,
}

impl ClobberRequest {
    pub fn new(build: BuildKey, slave: Option<&str>) -> Self {
        Self {
            build,
            slave: slave.map(str::to_string),
        }
    }

    /// The target slave, treating an empty name as the wildcard.
    pub fn slave(&self) -> Option<&str> {
        self.slave.as_deref().filter(|s| !s.is_empty())
    }
}

/// Who asked for a clobber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester(String);

impl Requester {
    pub fn anonymous() -> Self {
        Self(ANONYMOUS.to_string())
    }

    /// Identity from an authenticated name; blank names are anonymous.
    pub fn from_identity(identity: Option<&str>) -> Self {
        match identity.map(str::trim) {
            Some(name) if !name.is_empty() => Self(name.to_string()),
            _ => Self::anonymous(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary of an accepted clobber batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClobberOutcome {
    pub recorded: usize,
    /// Items skipped because they target a release builddir.
    pub skipped: usize,
}

/// The clobber time a build client should act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastClobber {
    pub builddir: String,
    pub lastclobber: i64,
    pub who: String,
}

/// Build clients split this line on `:` into builddir, time and requester.
impl fmt::Display for LastClobber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:{}:{}", self.builddir, self.lastclobber, self.who)
    }
}

/// A fabricated future clobber that makes any client wipe its builddir.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedClobber {
    pub builddir: String,
    pub timestamp: i64,
}

impl fmt::Display for ForcedClobber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{FORCE_CLOBBER_MARKER}", self.builddir, self.timestamp)
    }
}

/// Latest clobber of one build, as shown per builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClobberSummary {
    pub branch: String,
    pub builddir: String,
    pub buildername: String,
    pub lastclobber: Option<i64>,
    pub who: Option<String>,
}
