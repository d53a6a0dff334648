//! Executors bind action tokens to operations on one target.
//!
//! A factory builds an [`Executor`] from request parameters. The executor
//! resolves each token into an [`ActionFn`], a deferred operation that yields
//! an [`ActionResult`] when invoked. Resolution never touches hardware; the
//! connection opens when the first bound operation runs.
//!
//! Each target kind supports a fixed subset of the vocabulary:
//!
//! | action        | host | chassis | blade |
//! |---------------|------|---------|-------|
//! | ison          | yes  | yes     | yes   |
//! | poweron       | yes  | yes     | yes   |
//! | powercycle    | yes  | yes     | yes   |
//! | poweroff      | yes  |         | yes   |
//! | powercyclebmc | yes  |         | yes   |
//! | pxeonce       | yes  |         | yes   |
//! | pxeoncembr    | yes  |         |       |
//! | pxeonceefi    | yes  |         |       |
//! | screenshot    | yes  |         |       |
//! | reseat        |      |         | yes   |
//! | hardreset     |      |         |       |
//!
//! `sleep <duration>` is accepted everywhere.

pub mod blade;
pub mod chassis;
pub mod host;
pub mod params;
pub mod plan;
pub mod sleep;

use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Serialize, Serializer};

use crate::actions::{classify, Action, Classification};
use crate::driver::DriverResult;
use crate::error::{Error, Result};

pub use blade::{BladeByPositionExecutorFactory, BladeBySerialExecutorFactory, BladeExecutor};
pub use chassis::{ChassisExecutor, ChassisExecutorFactory};
pub use host::{HostExecutor, HostExecutorFactory};
pub use params::{Params, Target};
pub use plan::{ExecutionPlan, PlanMaker, PlanOutcome};
pub use sleep::{SleepExecutor, SleepExecutorFactory};

/// Message attached to successful results.
pub const MESSAGE_OK: &str = "ok";
/// Message attached to failed results.
pub const MESSAGE_FAILED: &str = "failed";

/// The deferred work of one bound action.
pub type ActionFuture = BoxFuture<'static, ActionResult>;

/// A bound action, run at most once.
pub type ActionFn = Box<dyn FnOnce() -> ActionFuture + Send>;

/// Outcome of one action.
#[derive(Debug, Serialize)]
pub struct ActionResult {
    /// The token as the client sent it
    pub action: String,
    /// Boolean outcome reported by the driver
    pub status: bool,
    /// Human-readable outcome, or a reference for screenshots
    pub message: String,
    /// Present when the action failed
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<Error>,
}

impl ActionResult {
    /// Create a result.
    pub fn new(
        action: impl Into<String>,
        status: bool,
        message: impl Into<String>,
        error: Option<Error>,
    ) -> Self {
        Self {
            action: action.into(),
            status,
            message: message.into(),
            error,
        }
    }

    /// A failed result.
    pub fn failed(action: impl Into<String>, error: impl Into<Error>) -> Self {
        Self::new(action, false, MESSAGE_FAILED, Some(error.into()))
    }

    /// Build a result from a driver status call.
    pub fn from_status(action: impl Into<String>, outcome: DriverResult<bool>) -> Self {
        match outcome {
            Ok(status) => Self::new(action, status, MESSAGE_OK, None),
            Err(err) => Self::failed(action, err),
        }
    }

    /// True when this result stops a plan.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<Error>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_str(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

/// The kind of device an executor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Standalone server
    Host,
    /// Blade chassis
    Chassis,
    /// Blade addressed by slot
    BladeByPosition,
    /// Blade addressed by serial number
    BladeBySerial,
    /// No device, delays only
    Sleep,
}

impl TargetKind {
    /// Name used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Host => "host",
            TargetKind::Chassis => "chassis",
            TargetKind::BladeByPosition => "blade-by-position",
            TargetKind::BladeBySerial => "blade-by-serial",
            TargetKind::Sleep => "sleep",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binds action tokens for one target and releases its session.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Which kind of target this drives.
    fn kind(&self) -> TargetKind;

    /// Bind a token to a deferred operation.
    ///
    /// Fails with [`Error::UnknownAction`] for tokens outside the vocabulary,
    /// [`Error::UnsupportedAction`] for known actions this target cannot
    /// perform, and [`Error::InvalidAction`] for malformed sleep tokens.
    fn resolve_action(&self, token: &str) -> Result<ActionFn>;

    /// Release the target's session. Errors are logged, not returned.
    async fn cleanup(&self);
}

/// Builds executors from request parameters.
pub trait ExecutorFactory: Send + Sync {
    /// Which kind of executor this builds.
    fn kind(&self) -> TargetKind;

    /// Validate `params` and build an executor. Never contacts hardware.
    fn create(&self, params: &Params) -> Result<Box<dyn Executor>>;
}

/// Classify `token` and bind it. `bind` is called for known actions and
/// returns `None` when the target does not support the action; sleeps are
/// bound here so every executor accepts them.
pub(crate) fn resolve_token<F>(token: &str, kind: TargetKind, bind: F) -> Result<ActionFn>
where
    F: FnOnce(Action) -> Option<ActionFn>,
{
    match classify(token) {
        Classification::Known(action) => bind(action).ok_or_else(|| Error::UnsupportedAction {
            action: token.to_string(),
            target: kind.as_str(),
        }),
        Classification::Sleep(Ok(duration)) => Ok(sleep::bind_sleep(token, duration)),
        Classification::Sleep(Err(source)) => Err(Error::InvalidAction {
            action: token.to_string(),
            source,
        }),
        Classification::Unknown => Err(Error::UnknownAction(token.to_string())),
    }
}
