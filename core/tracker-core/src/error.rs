//! Error types for tracker-core operations.

// ═══════════════════════════════════════════════════════════════════════════════
// Internal Error
// ═══════════════════════════════════════════════════════════════════════════════

/// All errors that can occur while maintaining a document's tracker.
///
/// Collaborators (document hosts, state stores) report their own failures
/// through the `Document`/`Store` variants so the request pipeline can turn
/// any of them into a single "critical error" reply.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    // ─────────────────────────────────────────────────────────────────────
    // Document Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Paragraph index {index} out of range (document has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Document operation failed: {operation}: {details}")]
    Document {
        operation: &'static str,
        details: String,
    },

    // ─────────────────────────────────────────────────────────────────────
    // State Store Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("State store error: {context}: {details}")]
    Store { context: String, details: String },

    #[error("JSON serialization error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TrackerError {
    pub fn document(operation: &'static str, details: impl Into<String>) -> Self {
        TrackerError::Document {
            operation,
            details: details.into(),
        }
    }

    pub fn store(context: impl Into<String>, details: impl Into<String>) -> Self {
        TrackerError::Store {
            context: context.into(),
            details: details.into(),
        }
    }
}

/// Convenience type alias for Results using TrackerError.
pub type Result<T> = std::result::Result<T, TrackerError>;

// Conversion for string error compatibility
impl From<TrackerError> for String {
    fn from(err: TrackerError) -> String {
        err.to_string()
    }
}
