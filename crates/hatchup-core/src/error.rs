//! Error types for the HatchUp backend.

use thiserror::Error;

/// A shared error type for every HatchUp crate.
///
/// Variants follow the failure taxonomy of the request pipeline: some are
/// terminal for a request (authentication, not found, store, completion),
/// others are recovered locally by the research orchestrator.
#[derive(Error, Debug, Clone)]
pub enum HatchupError {
    /// Missing or rejected credential.
    #[error("Authentication required: {0}")]
    AuthenticationRequired(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Caller supplied something the pipeline cannot work with.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required credential or endpoint is absent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Data access error (repository/storage layer)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", ...
        message: String,
    },

    /// Stored data could not be brought to the latest schema.
    #[error("Migration error: {0}")]
    Migration(String),

    /// One search source failed or timed out.
    #[error("{source_label} error: {reason}")]
    ToolUnavailable {
        source_label: String,
        reason: String,
    },

    /// The fan-out step could not run at all.
    #[error("Research orchestrator unavailable: {0}")]
    OrchestratorUnavailable(String),

    /// The completion service failed (network, auth, model).
    #[error("Completion service failure: {0}")]
    CompletionService(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HatchupError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an AuthenticationRequired error
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::AuthenticationRequired(message.into())
    }

    /// Creates an InvalidInput error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Migration error
    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    /// Creates a ToolUnavailable error for one search source
    pub fn tool_unavailable(source_label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ToolUnavailable {
            source_label: source_label.into(),
            reason: reason.into(),
        }
    }

    /// Creates a CompletionService error
    pub fn completion(message: impl Into<String>) -> Self {
        Self::CompletionService(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an authentication error
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::AuthenticationRequired(_))
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this error belongs to the persistence layer.
    ///
    /// Returns true for IO, data access, serialization and migration errors,
    /// which all surface to callers as a store failure.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::DataAccess(_) | Self::Serialization { .. } | Self::Migration(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for HatchupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for HatchupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for HatchupError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error, used at the migration framework boundary.
impl From<anyhow::Error> for HatchupError {
    fn from(err: anyhow::Error) -> Self {
        Self::Migration(format!("{:#}", err))
    }
}

/// A type alias for `Result<T, HatchupError>`.
pub type Result<T> = std::result::Result<T, HatchupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failure_classification() {
        assert!(HatchupError::io("disk gone").is_store_failure());
        assert!(HatchupError::migration("bad version").is_store_failure());
        assert!(!HatchupError::not_found("Analysis", "a1").is_store_failure());
        assert!(!HatchupError::completion("503").is_store_failure());
    }

    #[test]
    fn test_tool_unavailable_display_is_scoped_to_source() {
        let err = HatchupError::tool_unavailable("Reddit", "timed out");
        assert_eq!(err.to_string(), "Reddit error: timed out");
    }

    #[test]
    fn test_json_error_conversion() {
        let err: HatchupError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, HatchupError::Serialization { ref format, .. } if format == "JSON"));
    }
}
