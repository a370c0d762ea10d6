//! Versioned schema migration.
//!
//! Stored documents carry (or are classified into) a semver schema version and
//! are upgraded through a linear [`MigrationRegistry`] before use.

pub mod registry;
pub mod traits;
pub mod workspace;

pub use registry::MigrationRegistry;
pub use traits::{Migration, MigrationChain, TypedMigration};
pub use workspace::{create_workspace_migrator, detect_version};
