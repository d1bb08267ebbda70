//! Error types for the judgebot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all judgebot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Rules index errors ---
    #[error("Rules index error: {0}")]
    Index(#[from] IndexError),

    // --- Transcript protocol errors ---
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("{tool_name} timed out after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

/// Failures of the rules retrieval index.
///
/// `Clone` because the shared index handle caches the load outcome and hands
/// the same value to every waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// No persisted collection exists yet.
    #[error("Rules index not available: {0}")]
    NotAvailable(String),

    #[error("Rules index is corrupt: {0}")]
    Corrupt(String),

    #[error("Rules index storage error: {0}")]
    Storage(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),
}

/// Violations of the tool-call/result pairing protocol.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TranscriptError {
    #[error("Expected {expected} tool results, got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("Tool result for unknown call id '{0}'")]
    UnmatchedResult(String),

    #[error("Duplicate tool call id '{0}'")]
    DuplicateCallId(String),

    #[error("Assistant turn has no tool calls to answer")]
    NoToolCalls,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "scryfall_get_card".into(),
            reason: "HTTP 404".into(),
        });
        assert!(err.to_string().contains("scryfall_get_card"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn index_error_is_cloneable_for_sharing() {
        let err = IndexError::NotAvailable("no collection".into());
        let copy = err.clone();
        assert_eq!(err, copy);
        assert!(Error::from(copy).to_string().contains("not available"));
    }
}
