//! Data Transfer Objects for persistence.
//!
//! DTOs are the versioned on-disk schema. They stay private to the
//! infrastructure layer and convert to and from the core domain model.

mod workspace;

pub use workspace::{
    AnalysisRecordV2_0_0, LegacyWorkspaceV1_0_0, WORKSPACE_SCHEMA_VERSION, WorkspaceV2_0_0,
    format_timestamp, parse_timestamp,
};
