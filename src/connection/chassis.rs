//! Connection to a blade chassis controller.

use std::sync::Arc;

use futures::FutureExt;
use tracing::info;

use super::cache::BladePositionCache;
use super::lazy::LazyConnection;
use crate::driver::{ChassisDriver, ChassisManagement, Connector, DriverResult, Endpoint};

/// A lazily opened chassis session.
///
/// Serves both chassis-level operations and per-slot blade operations. There
/// is no fallback: chassis need the native driver. Blade serial lookups are
/// cached for the lifetime of the connection.
pub struct ChassisConnection {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
    session: LazyConnection<dyn ChassisManagement>,
    positions: BladePositionCache,
}

impl ChassisConnection {
    /// Create an unconnected session.
    pub fn new(endpoint: Endpoint, connector: Arc<dyn Connector>) -> Self {
        let session = LazyConnection::new(endpoint.host.clone());
        Self {
            endpoint,
            connector,
            session,
            positions: BladePositionCache::new(),
        }
    }

    /// The controller address.
    pub fn host(&self) -> &str {
        &self.endpoint.host
    }

    /// Open the session if it is not open yet and return it.
    pub async fn ensure_connected(&self) -> DriverResult<Arc<dyn ChassisManagement>> {
        let endpoint = self.endpoint.clone();
        let connector = Arc::clone(&self.connector);
        self.session
            .get_or_connect(move || {
                async move {
                    let handle = connector.connect_chassis(&endpoint).await?;
                    info!(host = %endpoint.host, "connected to chassis");
                    Ok(handle)
                }
                .boxed()
            })
            .await
    }

    /// Number of connection attempts made.
    pub fn connect_attempts(&self) -> usize {
        self.session.attempts()
    }

    /// The serial-to-slot cache of this connection.
    pub fn positions(&self) -> &BladePositionCache {
        &self.positions
    }

    pub async fn is_on(&self) -> DriverResult<bool> {
        let handle = self.ensure_connected().await?;
        ChassisDriver::is_on(&*handle).await
    }

    pub async fn power_on(&self) -> DriverResult<bool> {
        let handle = self.ensure_connected().await?;
        ChassisDriver::power_on(&*handle).await
    }

    pub async fn power_cycle(&self) -> DriverResult<bool> {
        let handle = self.ensure_connected().await?;
        ChassisDriver::power_cycle(&*handle).await
    }

    pub async fn is_on_blade(&self, position: i32) -> DriverResult<bool> {
        self.ensure_connected().await?.is_on_blade(position).await
    }

    pub async fn power_on_blade(&self, position: i32) -> DriverResult<bool> {
        self.ensure_connected().await?.power_on_blade(position).await
    }

    pub async fn power_off_blade(&self, position: i32) -> DriverResult<bool> {
        self.ensure_connected().await?.power_off_blade(position).await
    }

    pub async fn power_cycle_blade(&self, position: i32) -> DriverResult<bool> {
        self.ensure_connected().await?.power_cycle_blade(position).await
    }

    pub async fn power_cycle_bmc_blade(&self, position: i32) -> DriverResult<bool> {
        self.ensure_connected()
            .await?
            .power_cycle_bmc_blade(position)
            .await
    }

    pub async fn reseat_blade(&self, position: i32) -> DriverResult<bool> {
        self.ensure_connected().await?.reseat_blade(position).await
    }

    pub async fn pxe_once_blade(&self, position: i32) -> DriverResult<bool> {
        self.ensure_connected().await?.pxe_once_blade(position).await
    }

    /// Slot holding the blade with `serial`, asking the chassis at most once
    /// per serial.
    pub async fn find_blade_position(&self, serial: &str) -> DriverResult<i32> {
        let handle = self.ensure_connected().await?;
        self.positions
            .resolve(serial, || async move { handle.find_blade_position(serial).await })
            .await
    }

    /// Release the session if one is open. Safe to call repeatedly.
    pub async fn close(&self) -> DriverResult<()> {
        match self.session.take().await {
            Some(handle) => {
                info!(host = %self.endpoint.host, "closing chassis connection");
                ChassisDriver::close(&*handle).await
            }
            None => Ok(()),
        }
    }
}
