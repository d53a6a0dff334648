//! Delays between actions.

use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::debug;

use super::{
    resolve_token, ActionFn, ActionResult, Executor, ExecutorFactory, Params, TargetKind,
    MESSAGE_OK,
};
use crate::error::Result;

/// Bind a sleep token. The bound operation waits and always succeeds.
pub(crate) fn bind_sleep(token: &str, duration: Duration) -> ActionFn {
    let token = token.to_string();
    Box::new(move || {
        async move {
            debug!(action = %token, ?duration, "sleeping");
            tokio::time::sleep(duration).await;
            ActionResult::new(token, true, MESSAGE_OK, None)
        }
        .boxed()
    })
}

/// An executor that only understands sleep tokens and drives no device.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepExecutor;

#[async_trait]
impl Executor for SleepExecutor {
    fn kind(&self) -> TargetKind {
        TargetKind::Sleep
    }

    fn resolve_action(&self, token: &str) -> Result<ActionFn> {
        resolve_token(token, TargetKind::Sleep, |_| None)
    }

    async fn cleanup(&self) {}
}

/// Builds [`SleepExecutor`]s. Ignores all parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepExecutorFactory;

impl ExecutorFactory for SleepExecutorFactory {
    fn kind(&self) -> TargetKind {
        TargetKind::Sleep
    }

    fn create(&self, _params: &Params) -> Result<Box<dyn Executor>> {
        Ok(Box::new(SleepExecutor))
    }
}
