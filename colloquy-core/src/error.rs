//! Error types for Colloquy operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for Colloquy operations
pub type Result<T> = std::result::Result<T, ColloquyError>;

/// Why a call to an external collaborator (chat model or summarizer) failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvocationErrorKind {
    /// Transport failure, timeout, connection refused
    Network,
    /// Missing or rejected credentials
    Authentication,
    /// Provider throttled the request
    RateLimited,
    /// Provider answered with a non-success status
    Api,
    /// Response body could not be understood
    InvalidResponse,
    /// No provider is wired up
    NotConfigured,
}

impl InvocationErrorKind {
    /// Classify an HTTP status code returned by a provider
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimited,
            _ => Self::Api,
        }
    }
}

impl fmt::Display for InvocationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Authentication => "authentication",
            Self::RateLimited => "rate_limited",
            Self::Api => "api",
            Self::InvalidResponse => "invalid_response",
            Self::NotConfigured => "not_configured",
        };
        f.write_str(name)
    }
}

/// Error types for Colloquy
#[derive(Debug, thiserror::Error)]
pub enum ColloquyError {
    /// The chat model or summarizer call failed. Never retried locally.
    #[error("External invocation failed ({kind}): {message}")]
    ExternalInvocation {
        kind: InvocationErrorKind,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ColloquyError {
    /// Shorthand for an [`ColloquyError::ExternalInvocation`]
    pub fn invocation(kind: InvocationErrorKind, message: impl Into<String>) -> Self {
        ColloquyError::ExternalInvocation {
            kind,
            message: message.into(),
        }
    }

    /// Kind of the external failure, if this is one
    pub fn invocation_kind(&self) -> Option<InvocationErrorKind> {
        match self {
            ColloquyError::ExternalInvocation { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            InvocationErrorKind::from_status(401),
            InvocationErrorKind::Authentication
        );
        assert_eq!(
            InvocationErrorKind::from_status(403),
            InvocationErrorKind::Authentication
        );
        assert_eq!(
            InvocationErrorKind::from_status(429),
            InvocationErrorKind::RateLimited
        );
        assert_eq!(InvocationErrorKind::from_status(500), InvocationErrorKind::Api);
    }

    #[test]
    fn test_invocation_display() {
        let err = ColloquyError::invocation(InvocationErrorKind::RateLimited, "slow down");
        assert_eq!(
            err.to_string(),
            "External invocation failed (rate_limited): slow down"
        );
        assert_eq!(err.invocation_kind(), Some(InvocationErrorKind::RateLimited));
    }

    #[test]
    fn test_non_invocation_has_no_kind() {
        let err = ColloquyError::Configuration("bad".to_string());
        assert!(err.invocation_kind().is_none());
    }

    #[test]
    fn test_every_variant_is_classified() {
        let errors = [
            ColloquyError::invocation(InvocationErrorKind::Network, "refused"),
            ColloquyError::Configuration("model must not be empty".to_string()),
        ];

        // No wildcard arm, so a new variant has to be handled here.
        for err in &errors {
            match err {
                ColloquyError::ExternalInvocation { .. } => {
                    assert!(err.invocation_kind().is_some())
                }
                ColloquyError::Configuration(message) => {
                    assert!(err.invocation_kind().is_none());
                    assert_eq!(err.to_string(), format!("Configuration error: {}", message));
                }
            }
        }
    }
}
