//! Connection to a standalone server controller.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{info, warn};

use super::lazy::LazyConnection;
use crate::driver::{
    Connector, DriverError, DriverResult, Endpoint, HostDriver, HostFallback, Screenshot,
};

/// Which driver ended up serving a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The vendor-specific native driver.
    Native,
    /// The generic IPMI command-line driver.
    Ipmi,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Native => f.write_str("native"),
            BackendKind::Ipmi => f.write_str("ipmi"),
        }
    }
}

/// An established server session and the driver behind it.
#[derive(Clone)]
pub enum HostBackend {
    /// Served by the native driver.
    Native(Arc<dyn HostDriver>),
    /// Served by the fallback driver.
    Ipmi(Arc<dyn HostDriver>),
}

impl HostBackend {
    /// Which driver this is.
    pub fn kind(&self) -> BackendKind {
        match self {
            HostBackend::Native(_) => BackendKind::Native,
            HostBackend::Ipmi(_) => BackendKind::Ipmi,
        }
    }

    fn driver(&self) -> &Arc<dyn HostDriver> {
        match self {
            HostBackend::Native(driver) | HostBackend::Ipmi(driver) => driver,
        }
    }
}

/// A lazily opened server session with IPMI fallback.
///
/// The first operation opens the session. If the native driver reports the
/// hardware or vendor as unsupported, the fallback driver is opened instead
/// and serves every later operation. Any other connect error is returned
/// as-is and the next operation tries again.
pub struct HostConnection {
    endpoint: Endpoint,
    native: Arc<dyn Connector>,
    fallback: Arc<dyn HostFallback>,
    session: LazyConnection<HostBackend>,
}

impl HostConnection {
    /// Create an unconnected session.
    pub fn new(
        endpoint: Endpoint,
        native: Arc<dyn Connector>,
        fallback: Arc<dyn HostFallback>,
    ) -> Self {
        let session = LazyConnection::new(endpoint.host.clone());
        Self {
            endpoint,
            native,
            fallback,
            session,
        }
    }

    /// The controller address.
    pub fn host(&self) -> &str {
        &self.endpoint.host
    }

    /// Open the session if it is not open yet and return it.
    pub async fn ensure_connected(&self) -> DriverResult<Arc<HostBackend>> {
        let endpoint = self.endpoint.clone();
        let native = Arc::clone(&self.native);
        let fallback = Arc::clone(&self.fallback);
        self.session
            .get_or_connect(move || {
                async move {
                    connect_with_fallback(&endpoint, native.as_ref(), fallback.as_ref())
                        .await
                        .map(Arc::new)
                }
                .boxed()
            })
            .await
    }

    /// Which driver serves this server, if connected.
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.session.current().map(|backend| backend.kind())
    }

    /// Number of connection attempts made.
    pub fn connect_attempts(&self) -> usize {
        self.session.attempts()
    }

    pub async fn is_on(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().is_on().await
    }

    pub async fn power_on(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().power_on().await
    }

    pub async fn power_off(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().power_off().await
    }

    pub async fn power_cycle(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().power_cycle().await
    }

    pub async fn power_cycle_bmc(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().power_cycle_bmc().await
    }

    pub async fn pxe_once(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().pxe_once().await
    }

    pub async fn pxe_once_mbr(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().pxe_once_mbr().await
    }

    pub async fn pxe_once_efi(&self) -> DriverResult<bool> {
        self.ensure_connected().await?.driver().pxe_once_efi().await
    }

    /// Capture the console. Only the native driver can do this; on the
    /// fallback the driver is not asked at all.
    pub async fn screenshot(&self) -> DriverResult<Screenshot> {
        let backend = self.ensure_connected().await?;
        match backend.as_ref() {
            HostBackend::Native(driver) => {
                let (payload, extension) = driver.screenshot().await?;
                Ok(Screenshot {
                    payload,
                    extension,
                    hardware_type: driver.hardware_type(),
                })
            }
            HostBackend::Ipmi(_) => Err(DriverError::NotSupported(
                "screenshot is not supported by the IPMI fallback driver".into(),
            )),
        }
    }

    /// Release the session if one is open. Safe to call repeatedly.
    pub async fn close(&self) -> DriverResult<()> {
        match self.session.take().await {
            Some(backend) => {
                info!(host = %self.endpoint.host, backend = %backend.kind(), "closing connection");
                backend.driver().close().await
            }
            None => Ok(()),
        }
    }
}

async fn connect_with_fallback(
    endpoint: &Endpoint,
    native: &dyn Connector,
    fallback: &dyn HostFallback,
) -> DriverResult<HostBackend> {
    match native.connect_host(endpoint).await {
        Ok(driver) => {
            info!(host = %endpoint.host, backend = "native", "connected");
            Ok(HostBackend::Native(driver))
        }
        Err(err) if err.is_unsupported() => {
            warn!(
                host = %endpoint.host,
                error = %err,
                "native driver declined hardware, falling back to ipmi"
            );
            let driver = fallback.connect(endpoint).await?;
            info!(host = %endpoint.host, backend = "ipmi", "connected");
            Ok(HostBackend::Ipmi(driver))
        }
        Err(err) => Err(err),
    }
}
