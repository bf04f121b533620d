//! Fatal simulation errors.
//!
//! None of these are retried — a violation means the object graph is
//! inconsistent and the run cannot safely continue. Errors propagate to the
//! step boundary; the surrounding driver decides whether to log and halt or
//! discard the run.

use std::fmt;

/// Error raised by the simulation core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// A static invariant failed at construction time.
    Validation(String),
    /// An operation was attempted against an object whose state forbids it.
    IllegalState(String),
    /// Dependency or RNG state was used before being set up.
    Uninitialized(String),
}

impl SimError {
    /// Record the violation on the log facade before handing the error up.
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("validation error: {}", message);
        SimError::Validation(message)
    }

    pub(crate) fn illegal_state(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("illegal state: {}", message);
        SimError::IllegalState(message)
    }

    pub(crate) fn uninitialized(message: impl Into<String>) -> Self {
        let message = message.into();
        log::error!("uninitialized: {}", message);
        SimError::Uninitialized(message)
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Validation(msg) => write!(f, "validation error: {}", msg),
            SimError::IllegalState(msg) => write!(f, "illegal state: {}", msg),
            SimError::Uninitialized(msg) => write!(f, "uninitialized: {}", msg),
        }
    }
}

impl std::error::Error for SimError {}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let e = SimError::Validation("battery out of range".into());
        assert_eq!(e.to_string(), "validation error: battery out of range");
        let e = SimError::IllegalState("module failed".into());
        assert!(e.to_string().starts_with("illegal state"));
    }
}
