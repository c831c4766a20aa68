//! Error types for the reactive runtime.
//!
//! The runtime performs no I/O, so almost every failure a caller sees comes
//! from a memo or effect body (a panic that is propagated untouched). The
//! errors here cover the few conditions the runtime detects on its own.

use thiserror::Error;

/// Errors raised by the runtime itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A write was attempted while `limit` propagation passes were already
    /// nested inside each other. This almost always means an effect writes a
    /// signal that (directly or transitively) re-triggers the same effect.
    #[error(
        "propagation depth limit of {limit} exceeded: an effect is re-triggering itself through a signal write"
    )]
    PropagationDepthExceeded { limit: usize },

    /// The runtime configuration was rejected.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_error_names_the_limit() {
        let err = ReactiveError::PropagationDepthExceeded { limit: 8 };
        assert!(err.to_string().contains("limit of 8"));
    }

    #[test]
    fn config_error_carries_reason() {
        let err = ReactiveError::InvalidConfig("depth must be positive".into());
        assert_eq!(
            err.to_string(),
            "invalid runtime configuration: depth must be positive"
        );
    }
}
