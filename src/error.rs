//! Error types for session setup and control

use thiserror::Error;

use crate::sim::GamePhase;

/// Errors raised by the session core
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GameError {
    /// Bad startup parameters; the session cannot be created
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// A patient id outside the registry was referenced
    #[error("unknown patient {id} (registry holds {count})")]
    UnknownEntity { id: u32, count: u32 },

    /// Input that does not match the current phase or round kind.
    /// `Session::handle_input` swallows this one.
    #[error("`{input}` is not accepted during {phase:?}")]
    IllegalTransition {
        input: &'static str,
        phase: GamePhase,
    },
}

impl GameError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        GameError::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
