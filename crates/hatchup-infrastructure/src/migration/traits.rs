//! Building blocks of the schema migration framework.

use anyhow::Result;
use semver::Version;

/// Version metadata for one migration step.
pub trait Migration: Send + Sync {
    /// Schema version the step reads.
    fn from_version(&self) -> Version;

    /// Schema version the step produces.
    fn to_version(&self) -> Version;

    fn can_migrate(&self, version: &Version) -> bool {
        version == &self.from_version()
    }

    /// Short description, logged while the step runs.
    fn description(&self) -> &str;
}

/// A migration step that transforms a document.
///
/// Workspace documents migrate as untyped JSON (`From = To = Value`) so that
/// every historical layout can be represented without a dedicated type.
pub trait TypedMigration<From, To>: Migration + std::fmt::Debug {
    /// # Errors
    ///
    /// Returns an error if the document does not have the expected shape.
    fn migrate(&self, from: From) -> Result<To>;
}

/// Upgrades documents to the latest schema version.
pub trait MigrationChain<T> {
    /// Applies every step from `current_version` up to the latest version, in
    /// order, without skipping.
    ///
    /// # Errors
    ///
    /// Fails if `current_version` is newer than the latest version, if no step
    /// starts at `current_version`, or if any step fails.
    fn migrate_to_latest(&self, data: T, current_version: &Version) -> Result<T>;

    /// Version paths reachable from `from`. A linear chain yields at most one.
    fn available_paths(&self, from: &Version) -> Vec<Vec<Version>>;
}
