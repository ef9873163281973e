//! Error types for the engine registry, the startup hook, and dispatch.
//!
//! Registry errors are recoverable and returned to the caller. Bootstrap
//! errors are fatal to startup and are never retried.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by [`EngineRegistry`](crate::registry::EngineRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("invalid engine identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: &'static str },

    #[error("an engine is already registered under '{id}'")]
    DuplicateRegistration { id: String },
}

/// Errors raised while bringing up the background engine.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("host base initialization has not completed")]
    HostNotInitialized,

    #[error("background engine was shut down for the rest of this process")]
    ShutDown,

    #[error("failed to construct background engine: {reason}")]
    EngineConstructionFailure { reason: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Errors raised while dispatching work into a stored engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine #{instance} has been released")]
    Released { instance: u64 },

    #[error("entry point '{entry_point}' timed out after {timeout:?}")]
    TimedOut {
        entry_point: String,
        timeout: Duration,
    },

    #[error("entry point '{entry_point}' failed: {message}")]
    EntryPoint {
        entry_point: String,
        message: String,
    },
}

/// Errors surfaced to a trigger handler.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Reject identifiers the registry cannot key on.
pub fn validate_id(id: &str) -> Result<(), RegistryError> {
    if id.is_empty() {
        return Err(RegistryError::InvalidIdentifier {
            id: id.to_string(),
            reason: "must not be empty",
        });
    }
    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RegistryError::InvalidIdentifier {
            id: id.to_string(),
            reason: "must not contain whitespace or control characters",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_id("background_engine").is_ok());
        assert!(validate_id("x").is_ok());
        assert!(validate_id("engine-2.alarm").is_ok());
    }

    #[test]
    fn rejects_empty() {
        let err = validate_id("").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidIdentifier { .. }));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn rejects_whitespace_and_control() {
        assert!(validate_id("background engine").is_err());
        assert!(validate_id(" ").is_err());
        assert!(validate_id("engine\n").is_err());
        assert!(validate_id("eng\u{0}ine").is_err());
    }

    #[test]
    fn registry_error_converts_into_bootstrap_error() {
        let err: BootstrapError = RegistryError::DuplicateRegistration {
            id: "x".to_string(),
        }
        .into();
        assert!(matches!(err, BootstrapError::Registry(_)));
        assert_eq!(err.to_string(), "an engine is already registered under 'x'");
    }
}
