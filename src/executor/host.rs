//! Executor for standalone servers.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use tracing::warn;

use super::params::Target;
use super::{resolve_token, ActionFn, ActionResult, Executor, ExecutorFactory, Params, TargetKind};
use crate::actions::Action;
use crate::connection::HostConnection;
use crate::driver::{Connector, Credentials, Endpoint, HostFallback};
use crate::error::{Error, Result};
use crate::screenshot::{self, ScreenshotStore};

/// Server operations, one per supported action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostOp {
    IsOn,
    PowerOn,
    PowerOff,
    PowerCycle,
    PowerCycleBmc,
    PxeOnce,
    PxeOnceMbr,
    PxeOnceEfi,
    Screenshot,
}

impl HostOp {
    fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::IsOn => Some(HostOp::IsOn),
            Action::PowerOn => Some(HostOp::PowerOn),
            Action::PowerOff => Some(HostOp::PowerOff),
            Action::PowerCycle => Some(HostOp::PowerCycle),
            Action::PowerCycleBmc => Some(HostOp::PowerCycleBmc),
            Action::PxeOnce => Some(HostOp::PxeOnce),
            Action::PxeOnceMbr => Some(HostOp::PxeOnceMbr),
            Action::PxeOnceEfi => Some(HostOp::PxeOnceEfi),
            Action::Screenshot => Some(HostOp::Screenshot),
            Action::HardReset | Action::Reseat => None,
        }
    }

    async fn run(
        self,
        action: String,
        host: &str,
        conn: &HostConnection,
        store: &dyn ScreenshotStore,
    ) -> ActionResult {
        let outcome = match self {
            HostOp::IsOn => conn.is_on().await,
            HostOp::PowerOn => conn.power_on().await,
            HostOp::PowerOff => conn.power_off().await,
            HostOp::PowerCycle => conn.power_cycle().await,
            HostOp::PowerCycleBmc => conn.power_cycle_bmc().await,
            HostOp::PxeOnce => conn.pxe_once().await,
            HostOp::PxeOnceMbr => conn.pxe_once_mbr().await,
            HostOp::PxeOnceEfi => conn.pxe_once_efi().await,
            HostOp::Screenshot => return take_screenshot(conn, store, host, action).await,
        };
        ActionResult::from_status(action, outcome)
    }
}

/// Runs actions against one server controller.
pub struct HostExecutor {
    host: String,
    conn: Arc<HostConnection>,
    store: Arc<dyn ScreenshotStore>,
}

impl HostExecutor {
    /// The connection this executor drives.
    pub fn connection(&self) -> &Arc<HostConnection> {
        &self.conn
    }
}

#[async_trait]
impl Executor for HostExecutor {
    fn kind(&self) -> TargetKind {
        TargetKind::Host
    }

    fn resolve_action(&self, token: &str) -> Result<ActionFn> {
        resolve_token(token, TargetKind::Host, |action| {
            let op = HostOp::for_action(action)?;
            let token = token.to_string();
            let host = self.host.clone();
            let conn = Arc::clone(&self.conn);
            let store = Arc::clone(&self.store);
            let bound: ActionFn = Box::new(move || {
                async move { op.run(token, &host, &conn, store.as_ref()).await }.boxed()
            });
            Some(bound)
        })
    }

    async fn cleanup(&self) {
        if let Err(err) = self.conn.close().await {
            warn!(host = %self.host, error = %err, "failed to close connection");
        }
    }
}

async fn take_screenshot(
    conn: &HostConnection,
    store: &dyn ScreenshotStore,
    host: &str,
    action: String,
) -> ActionResult {
    let shot = match conn.screenshot().await {
        Ok(shot) => shot,
        Err(err) => return ActionResult::failed(action, err),
    };
    let name = screenshot::file_name(host, &shot.hardware_type, &shot.extension, Utc::now());
    match store.persist(shot.payload, &name).await {
        Ok(reference) => ActionResult::new(action, true, reference, None),
        Err(err) => ActionResult::failed(action, Error::from(err)),
    }
}

/// Builds [`HostExecutor`]s.
pub struct HostExecutorFactory {
    credentials: Credentials,
    native: Arc<dyn Connector>,
    fallback: Arc<dyn HostFallback>,
    store: Arc<dyn ScreenshotStore>,
}

impl HostExecutorFactory {
    /// Create a factory.
    pub fn new(
        credentials: Credentials,
        native: Arc<dyn Connector>,
        fallback: Arc<dyn HostFallback>,
        store: Arc<dyn ScreenshotStore>,
    ) -> Self {
        Self {
            credentials,
            native,
            fallback,
            store,
        }
    }
}

impl ExecutorFactory for HostExecutorFactory {
    fn kind(&self) -> TargetKind {
        TargetKind::Host
    }

    fn create(&self, params: &Params) -> Result<Box<dyn Executor>> {
        let host = Target::host_from(params)?.controller().to_string();
        let conn = HostConnection::new(
            Endpoint::new(host.clone(), self.credentials.clone()),
            Arc::clone(&self.native),
            Arc::clone(&self.fallback),
        );
        Ok(Box::new(HostExecutor {
            host,
            conn: Arc::new(conn),
            store: Arc::clone(&self.store),
        }))
    }
}
