//! Error types for metastore-audit

use thiserror::Error;

/// Errors that can occur while normalizing or routing audit events
#[derive(Debug, Error)]
pub enum AuditError {
    /// Neither a table nor a partition content block is present
    #[error("Unrecognized metastore audit event: {raw}")]
    UnrecognizedEventKind { raw: String },

    /// Both the old and the new entity snapshot are absent
    #[error("Audit event '{event_name}' carries neither an old nor a new entity snapshot")]
    MissingEntitySnapshot { event_name: String },

    /// A load-bearing field is absent or has the wrong shape
    #[error("Required field '{field}' is {reason}")]
    MalformedRequiredField { field: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Downstream audit sink failure
    #[error("Sink error: {0}")]
    Sink(String),
}

impl AuditError {
    pub(crate) fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRequiredField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error is a property of the message itself.
    ///
    /// Such messages will never normalize no matter how often they are
    /// redelivered, so callers route them to a dead-letter handler.
    pub fn is_message_fault(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedEventKind { .. }
                | Self::MissingEntitySnapshot { .. }
                | Self::MalformedRequiredField { .. }
        )
    }
}

/// Result type alias for audit operations
pub type Result<T> = std::result::Result<T, AuditError>;
