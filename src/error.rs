//! Error types for bmc-actor.
//!
//! Two layers exist. [`DriverError`](crate::driver::DriverError) is produced by
//! anything that talks to management hardware and is cheap to clone, because a
//! single connection attempt may be awaited by many callers. [`Error`] is the
//! crate-wide type: plan compilation failures, configuration problems and
//! action-level failures all end up here.

use thiserror::Error;

use crate::actions::DurationError;
use crate::driver::DriverError;
use crate::screenshot::StoreError;

/// Result type alias for bmc-actor operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for bmc-actor.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Plan Compilation Errors
    // ========================================================================
    /// A required executor parameter is absent.
    #[error("no required parameter '{0}'")]
    MissingParameter(String),

    /// A parameter is present but cannot be interpreted.
    #[error("failed to parse parameter '{name}' from {value:?}: {message}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Raw value as received
        value: String,
        /// What was wrong with it
        message: String,
    },

    /// The token is not part of the action vocabulary.
    #[error("action '{0}' is unknown")]
    UnknownAction(String),

    /// The token is a known action the target kind cannot perform.
    #[error("action '{action}' is not supported by the {target} executor")]
    UnsupportedAction {
        /// Action token
        action: String,
        /// Target kind that rejected it
        target: &'static str,
    },

    /// The token looks like a sleep action but its duration is malformed.
    #[error("invalid action '{action}': {source}")]
    InvalidAction {
        /// Action token
        action: String,
        /// Duration parse failure
        #[source]
        source: DurationError,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Management hardware reported or caused a failure.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Persisting a screenshot failed.
    #[error("screenshot storage failed: {0}")]
    Store(#[from] StoreError),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(
        name: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            value: value.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// True for failures detected while compiling a plan, before any
    /// hardware is contacted. These map to client errors on every surface.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_)
                | Self::InvalidParameter { .. }
                | Self::UnknownAction(_)
                | Self::UnsupportedAction { .. }
                | Self::InvalidAction { .. }
        )
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_compile_error() => 4,
            Self::Driver(_) | Self::Store(_) => 2,
            _ => 1,
        }
    }
}
