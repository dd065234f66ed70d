//! Error types raised by fakes, rules and assertions.

use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the framework. All of them propagate synchronously to the
/// caller; nothing is retried or logged-and-ignored.
#[derive(Debug, Clone, Error)]
pub enum FakeError {
    /// A setup that cannot be honored (non-interceptable member, incompatible
    /// return value, missing base implementation, ...).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The proxy engine could not produce an instance.
    #[error("creation error: {0}")]
    Creation(String),

    /// An assertion on the call log failed, or a strict fake received an
    /// unconfigured call.
    #[error("{0}")]
    Expectation(String),

    /// Malformed call specification.
    #[error("argument error: {0}")]
    Argument(String),

    /// Scope discipline violated (nested ordered scopes, out-of-order close).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// An error configured by the test author through `throws`.
    #[error("{0}")]
    Thrown(Arc<anyhow::Error>),
}

impl FakeError {
    pub fn thrown(error: anyhow::Error) -> Self {
        FakeError::Thrown(Arc::new(error))
    }

    /// The user error when this is a configured throw.
    pub fn as_thrown(&self) -> Option<&anyhow::Error> {
        match self {
            FakeError::Thrown(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Result type for framework operations.
pub type FakeResult<T> = Result<T, FakeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = FakeError::Configuration("static member".into());
        assert_eq!(err.to_string(), "configuration error: static member");

        let err = FakeError::Argument("not a method call or property getter".into());
        assert_eq!(
            err.to_string(),
            "argument error: not a method call or property getter"
        );

        let err = FakeError::thrown(anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "boom");
        assert!(err.as_thrown().is_some());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FakeError>();
    }
}
