//! Release naming rules.
//!
//! Release builddirs must never be clobbered and are hidden from branch
//! listings; release builders are hidden from per-builder summaries (that
//! filter runs in SQL over [`BUILDER_REL_PREFIX`]). Both checks are
//! literal, case-sensitive prefix tests.

/// Prefix which denotes a release builddir.
pub const BUILDDIR_REL_PREFIX: &str = "rel-";

/// Prefix which denotes a release builder.
pub const BUILDER_REL_PREFIX: &str = "release-";

/// Marker stored in `who` when the requester is not authenticated.
pub const ANONYMOUS: &str = "anonymous";

/// Returns true if `builddir` belongs to a release build.
pub fn is_release_builddir(builddir: &str) -> bool {
    builddir.starts_with(BUILDDIR_REL_PREFIX)
}
