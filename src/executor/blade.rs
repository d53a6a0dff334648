//! Executors for blades, addressed by slot or by serial number.
//!
//! Both kinds share one executor. A serial-addressed blade resolves its slot
//! through the chassis connection's position cache each time an action runs;
//! only the first lookup reaches the chassis.

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::warn;

use super::params::{Target, PARAM_BLADE_POS, PARAM_BLADE_SERIAL};
use super::{resolve_token, ActionFn, ActionResult, Executor, ExecutorFactory, Params, TargetKind};
use crate::actions::Action;
use crate::connection::ChassisConnection;
use crate::driver::{Connector, Credentials, DriverResult, Endpoint};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BladeOp {
    IsOn,
    PowerOn,
    PowerOff,
    PowerCycle,
    PowerCycleBmc,
    PxeOnce,
    Reseat,
}

impl BladeOp {
    fn for_action(action: Action) -> Option<Self> {
        match action {
            Action::IsOn => Some(BladeOp::IsOn),
            Action::PowerOn => Some(BladeOp::PowerOn),
            Action::PowerOff => Some(BladeOp::PowerOff),
            Action::PowerCycle => Some(BladeOp::PowerCycle),
            Action::PowerCycleBmc => Some(BladeOp::PowerCycleBmc),
            Action::PxeOnce => Some(BladeOp::PxeOnce),
            Action::Reseat => Some(BladeOp::Reseat),
            Action::HardReset | Action::PxeOnceMbr | Action::PxeOnceEfi | Action::Screenshot => {
                None
            }
        }
    }

    async fn invoke(self, conn: &ChassisConnection, position: i32) -> DriverResult<bool> {
        match self {
            BladeOp::IsOn => conn.is_on_blade(position).await,
            BladeOp::PowerOn => conn.power_on_blade(position).await,
            BladeOp::PowerOff => conn.power_off_blade(position).await,
            BladeOp::PowerCycle => conn.power_cycle_blade(position).await,
            BladeOp::PowerCycleBmc => conn.power_cycle_bmc_blade(position).await,
            BladeOp::PxeOnce => conn.pxe_once_blade(position).await,
            BladeOp::Reseat => conn.reseat_blade(position).await,
        }
    }
}

/// How a blade is identified within its chassis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BladeLocator {
    /// Fixed slot number.
    Position(i32),
    /// Serial number, looked up on first use.
    Serial(String),
}

impl BladeLocator {
    /// Split a blade target into its chassis and locator. `None` for
    /// servers and chassis.
    pub fn from_target(target: Target) -> Option<(String, Self)> {
        match target {
            Target::BladeByPosition { chassis, position } => {
                Some((chassis, BladeLocator::Position(position)))
            }
            Target::BladeBySerial { chassis, serial } => Some((chassis, BladeLocator::Serial(serial))),
            Target::Host { .. } | Target::Chassis { .. } => None,
        }
    }

    async fn position(&self, conn: &ChassisConnection) -> DriverResult<i32> {
        match self {
            BladeLocator::Position(position) => Ok(*position),
            BladeLocator::Serial(serial) => conn.find_blade_position(serial).await,
        }
    }
}

/// Runs actions against one blade through its chassis controller.
pub struct BladeExecutor {
    chassis: String,
    locator: Arc<BladeLocator>,
    conn: Arc<ChassisConnection>,
}

impl BladeExecutor {
    /// The chassis connection this executor drives.
    pub fn connection(&self) -> &Arc<ChassisConnection> {
        &self.conn
    }
}

#[async_trait]
impl Executor for BladeExecutor {
    fn kind(&self) -> TargetKind {
        match self.locator.as_ref() {
            BladeLocator::Position(_) => TargetKind::BladeByPosition,
            BladeLocator::Serial(_) => TargetKind::BladeBySerial,
        }
    }

    fn resolve_action(&self, token: &str) -> Result<ActionFn> {
        resolve_token(token, self.kind(), |action| {
            let op = BladeOp::for_action(action)?;
            let token = token.to_string();
            let conn = Arc::clone(&self.conn);
            let locator = Arc::clone(&self.locator);
            let bound: ActionFn = Box::new(move || {
                async move {
                    let outcome = match locator.position(&conn).await {
                        Ok(position) => op.invoke(&conn, position).await,
                        Err(err) => Err(err),
                    };
                    ActionResult::from_status(token, outcome)
                }
                .boxed()
            });
            Some(bound)
        })
    }

    async fn cleanup(&self) {
        if let Err(err) = self.conn.close().await {
            warn!(chassis = %self.chassis, error = %err, "failed to close chassis connection");
        }
    }
}

fn blade_executor(
    chassis: String,
    locator: BladeLocator,
    credentials: &Credentials,
    connector: &Arc<dyn Connector>,
) -> Box<dyn Executor> {
    let conn = ChassisConnection::new(
        Endpoint::new(chassis.clone(), credentials.clone()),
        Arc::clone(connector),
    );
    Box::new(BladeExecutor {
        chassis,
        locator: Arc::new(locator),
        conn: Arc::new(conn),
    })
}

/// Builds executors for blades addressed by slot.
pub struct BladeByPositionExecutorFactory {
    credentials: Credentials,
    connector: Arc<dyn Connector>,
}

impl BladeByPositionExecutorFactory {
    /// Create a factory.
    pub fn new(credentials: Credentials, connector: Arc<dyn Connector>) -> Self {
        Self {
            credentials,
            connector,
        }
    }
}

impl ExecutorFactory for BladeByPositionExecutorFactory {
    fn kind(&self) -> TargetKind {
        TargetKind::BladeByPosition
    }

    fn create(&self, params: &Params) -> Result<Box<dyn Executor>> {
        let target = Target::blade_by_position_from(params)?;
        let (chassis, locator) = BladeLocator::from_target(target)
            .ok_or_else(|| Error::MissingParameter(PARAM_BLADE_POS.to_string()))?;
        Ok(blade_executor(
            chassis,
            locator,
            &self.credentials,
            &self.connector,
        ))
    }
}

/// Builds executors for blades addressed by serial number.
pub struct BladeBySerialExecutorFactory {
    credentials: Credentials,
    connector: Arc<dyn Connector>,
}

impl BladeBySerialExecutorFactory {
    /// Create a factory.
    pub fn new(credentials: Credentials, connector: Arc<dyn Connector>) -> Self {
        Self {
            credentials,
            connector,
        }
    }
}

impl ExecutorFactory for BladeBySerialExecutorFactory {
    fn kind(&self) -> TargetKind {
        TargetKind::BladeBySerial
    }

    fn create(&self, params: &Params) -> Result<Box<dyn Executor>> {
        let target = Target::blade_by_serial_from(params)?;
        let (chassis, locator) = BladeLocator::from_target(target)
            .ok_or_else(|| Error::MissingParameter(PARAM_BLADE_SERIAL.to_string()))?;
        Ok(blade_executor(
            chassis,
            locator,
            &self.credentials,
            &self.connector,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::NoNativeDriver;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_support_matrix() {
        let supported: Vec<&str> = Action::ALL
            .into_iter()
            .filter(|a| BladeOp::for_action(*a).is_some())
            .map(Action::as_str)
            .collect();
        assert_eq!(
            supported,
            vec!["poweroff", "poweron", "powercycle", "reseat", "ison", "powercyclebmc", "pxeonce"]
        );
    }

    #[test]
    fn test_factories_validate_parameters() {
        let by_pos =
            BladeByPositionExecutorFactory::new(Credentials::default(), Arc::new(NoNativeDriver));
        assert!(matches!(
            by_pos.create(&params(json!({"host": "c1", "bladePos": "x"}))),
            Err(Error::InvalidParameter { .. })
        ));
        let executor = by_pos
            .create(&params(json!({"host": "c1", "bladePos": "-1"})))
            .unwrap();
        assert_eq!(executor.kind(), TargetKind::BladeByPosition);

        let by_serial =
            BladeBySerialExecutorFactory::new(Credentials::default(), Arc::new(NoNativeDriver));
        assert!(matches!(
            by_serial.create(&params(json!({"host": "c1"}))),
            Err(Error::MissingParameter(_))
        ));
        let executor = by_serial
            .create(&params(json!({"host": "c1", "bladeSerial": "SN1"})))
            .unwrap();
        assert_eq!(executor.kind(), TargetKind::BladeBySerial);
        assert!(matches!(
            executor.resolve_action("screenshot"),
            Err(Error::UnsupportedAction { target: "blade-by-serial", .. })
        ));
    }

    #[test]
    fn test_locator_from_target() {
        let target = Target::BladeBySerial {
            chassis: "c1".into(),
            serial: "SN1".into(),
        };
        assert_eq!(
            BladeLocator::from_target(target),
            Some(("c1".to_string(), BladeLocator::Serial("SN1".into())))
        );
        assert_eq!(
            BladeLocator::from_target(Target::Chassis { host: "c1".into() }),
            None
        );
    }
}
