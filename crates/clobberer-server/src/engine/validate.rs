//! Field checks for values that end up in colon-delimited responses.

use crate::storage::BuildKey;

use super::EngineError;

pub const MAX_BRANCH_LEN: usize = 50;
pub const MAX_BUILDDIR_LEN: usize = 100;
pub const MAX_BUILDERNAME_LEN: usize = 100;
pub const MAX_SLAVE_LEN: usize = 30;
pub const MAX_WHO_LEN: usize = 50;

pub fn field(name: &'static str, value: &str, max_len: usize) -> Result<(), EngineError> {
    if value.contains(':') {
        return Err(EngineError::InvalidField {
            field: name,
            reason: "must not contain ':'".to_string(),
        });
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(EngineError::InvalidField {
            field: name,
            reason: format!("{len} characters exceeds limit of {max_len}"),
        });
    }
    Ok(())
}

pub fn build_key(key: &BuildKey) -> Result<(), EngineError> {
    field("branch", &key.branch, MAX_BRANCH_LEN)?;
    field("builddir", &key.builddir, MAX_BUILDDIR_LEN)?;
    field("buildername", &key.buildername, MAX_BUILDERNAME_LEN)
}

pub fn slave(slave: Option<&str>) -> Result<(), EngineError> {
    slave.map_or(Ok(()), |s| field("slave", s, MAX_SLAVE_LEN))
}
