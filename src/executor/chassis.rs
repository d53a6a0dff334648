//! Executor for blade chassis.

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::warn;

use super::params::Target;
use super::{resolve_token, ActionFn, ActionResult, Executor, ExecutorFactory, Params, TargetKind};
use crate::actions::Action;
use crate::connection::ChassisConnection;
use crate::driver::{Connector, Credentials, DriverResult, Endpoint};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChassisOp {
    IsOn,
    PowerOn,
    PowerCycle,
}

impl ChassisOp {
    fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::IsOn => Some(ChassisOp::IsOn),
            Action::PowerOn => Some(ChassisOp::PowerOn),
            Action::PowerCycle => Some(ChassisOp::PowerCycle),
            Action::PowerOff
            | Action::HardReset
            | Action::Reseat
            | Action::PowerCycleBmc
            | Action::PxeOnce
            | Action::PxeOnceMbr
            | Action::PxeOnceEfi
            | Action::Screenshot => None,
        }
    }

    async fn invoke(self, conn: &ChassisConnection) -> DriverResult<bool> {
        match self {
            ChassisOp::IsOn => conn.is_on().await,
            ChassisOp::PowerOn => conn.power_on().await,
            ChassisOp::PowerCycle => conn.power_cycle().await,
        }
    }
}

/// Runs actions against a chassis as a whole.
pub struct ChassisExecutor {
    host: String,
    conn: Arc<ChassisConnection>,
}

#[async_trait]
impl Executor for ChassisExecutor {
    fn kind(&self) -> TargetKind {
        TargetKind::Chassis
    }

    fn resolve_action(&self, token: &str) -> Result<ActionFn> {
        resolve_token(token, TargetKind::Chassis, |action| {
            let op = ChassisOp::for_action(action)?;
            let token = token.to_string();
            let conn = Arc::clone(&self.conn);
            let bound: ActionFn = Box::new(move || {
                async move { ActionResult::from_status(token, op.invoke(&conn).await) }.boxed()
            });
            Some(bound)
        })
    }

    async fn cleanup(&self) {
        if let Err(err) = self.conn.close().await {
            warn!(host = %self.host, error = %err, "failed to close chassis connection");
        }
    }
}

/// Builds [`ChassisExecutor`]s.
pub struct ChassisExecutorFactory {
    credentials: Credentials,
    connector: Arc<dyn Connector>,
}

impl ChassisExecutorFactory {
    /// Create a factory.
    pub fn new(credentials: Credentials, connector: Arc<dyn Connector>) -> Self {
        Self {
            credentials,
            connector,
        }
    }
}

impl ExecutorFactory for ChassisExecutorFactory {
    fn kind(&self) -> TargetKind {
        TargetKind::Chassis
    }

    fn create(&self, params: &Params) -> Result<Box<dyn Executor>> {
        let host = Target::chassis_from(params)?.controller().to_string();
        let conn = ChassisConnection::new(
            Endpoint::new(host.clone(), self.credentials.clone()),
            Arc::clone(&self.connector),
        );
        Ok(Box::new(ChassisExecutor {
            host,
            conn: Arc::new(conn),
        }))
    }
}
