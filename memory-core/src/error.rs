//! Error taxonomy for the memory service.
//!
//! Every handler-facing failure maps to one of the stable codes below so the
//! (out-of-scope) router can serialize `{error, code, context}` without
//! reaching into internals. See spec §7 for the taxonomy this mirrors.

use serde_json::Value;
use std::collections::HashMap;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Stable error code, e.g. `E1000`.
pub type ErrorCode = &'static str;

/// Errors produced by the memory service.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input violates a schema or size limit. Context: `{field, limit?, actual?}`.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        context: HashMap<String, Value>,
    },

    /// Unknown action requested for a tool.
    #[error("invalid action '{action}' for tool '{tool}'")]
    InvalidAction {
        tool: String,
        action: String,
        valid_actions: Vec<String>,
    },

    /// Entity id or name does not resolve in the effective scope.
    #[error("not found: {what}")]
    NotFound { what: String },

    /// Scoped slug collision. Idempotent callers should swallow this and
    /// return the existing row.
    #[error("unique constraint violated on {field}='{value}' within scope {scope}")]
    UniqueConstraint {
        field: String,
        value: String,
        scope: String,
    },

    /// Permission service denied the action.
    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    /// Caller exceeded the configured rate limit.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Special case of `Validation` for size caps.
    #[error("size limit exceeded for {field}: {actual}{unit} > {limit}{unit}")]
    SizeLimitExceeded {
        field: String,
        limit: usize,
        actual: usize,
        unit: String,
    },

    /// External I/O exceeded the configured deadline.
    #[error("operation timed out after {deadline_ms}ms")]
    OperationTimeout { deadline_ms: u64 },

    /// A dependency (embedding/extraction provider, remote rate limiter) is
    /// unavailable; callers may downgrade rather than fail.
    #[error("dependency unavailable: {dependency}")]
    DependencyUnavailable { dependency: String },

    /// Last resort. Message MUST already be sanitized of paths/secrets.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Stable error code for wire serialization.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Validation { .. } => "E1000",
            Error::InvalidAction { .. } => "E1002",
            Error::NotFound { .. } => "E1100",
            Error::UniqueConstraint { .. } => "E1200",
            Error::PermissionDenied { .. } => "E1300",
            Error::RateLimited { .. } => "E2000",
            Error::SizeLimitExceeded { .. } => "E2100",
            Error::OperationTimeout { .. } => "E2200",
            Error::DependencyUnavailable { .. } => "E3000",
            Error::Internal { .. } => "E5000",
        }
    }

    /// Whether this error indicates a condition the caller can safely retry
    /// (matches spec §7's degraded-path / best-effort policy).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::RateLimited { .. }
                | Error::OperationTimeout { .. }
                | Error::DependencyUnavailable { .. }
        )
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let mut context = HashMap::new();
        context.insert("field".to_string(), Value::String(field.clone()));
        Error::Validation {
            message: message.into(),
            context,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound { what: what.into() }
    }

    pub fn size_limit(field: impl Into<String>, limit: usize, actual: usize) -> Self {
        Error::SizeLimitExceeded {
            field: field.into(),
            limit,
            actual,
            unit: "bytes".to_string(),
        }
    }

    /// Wrap an unexpected error, sanitizing it before it reaches the wire.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Error::Internal {
            message: sanitize(&err.to_string()),
        }
    }
}

/// Strip anything resembling a filesystem path or secret-bearing token from
/// a message before it is allowed into an `InternalError`.
fn sanitize(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    for word in message.split_whitespace() {
        if word.contains('/') || word.contains('\\') {
            out.push_str("<path>");
        } else if word.to_ascii_lowercase().contains("key")
            || word.to_ascii_lowercase().contains("secret")
            || word.to_ascii_lowercase().contains("token")
        {
            out.push_str("<redacted>");
        } else {
            out.push_str(word);
        }
        out.push(' ');
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::not_found("x").code(), "E1100");
        assert_eq!(
            Error::RateLimited {
                retry_after_ms: 60_000
            }
            .code(),
            "E2000"
        );
    }

    #[test]
    fn internal_sanitizes_paths_and_secrets() {
        let err = Error::internal("failed to open /etc/secrets/api_key=abcdef for agent-1");
        let Error::Internal { message } = err else {
            panic!("expected internal error");
        };
        assert!(!message.contains("/etc"));
        assert!(message.contains("<redacted>") || message.contains("<path>"));
    }

    #[test]
    fn recoverable_classification() {
        assert!(Error::RateLimited { retry_after_ms: 1 }.is_recoverable());
        assert!(!Error::NotFound { what: "x".into() }.is_recoverable());
    }
}
