//! Management hardware driver seam.
//!
//! The engine never speaks a vendor protocol itself. Native drivers are
//! supplied through a [`Connector`]; each connected handle exposes one of the
//! capability sets below. The IPMI command-line fallback in
//! [`crate::connection::ipmi`] implements [`HostDriver`] too, so the rest of
//! the engine cannot tell the two apart except where it asks.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Result type for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by management hardware drivers.
///
/// Cloneable because a single connection attempt is awaited by every caller
/// that raced to open it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The device model is not handled by the native driver.
    #[error("hardware not supported: {0}")]
    UnsupportedHardware(String),

    /// The device vendor is not handled by the native driver.
    #[error("vendor not supported: {0}")]
    VendorNotSupported(String),

    /// The controller could not be reached.
    #[error("failed to connect to {host}: {message}")]
    ConnectionFailed {
        /// Controller address
        host: String,
        /// Error message
        message: String,
    },

    /// The controller rejected the credentials.
    #[error("authentication failed for {0}")]
    AuthenticationFailed(String),

    /// The chassis controller answered but is not the active one.
    #[error("this is not an active controller")]
    NotActive,

    /// The controller accepted the request but the operation failed.
    #[error("{0}")]
    Operation(String),

    /// The driver does not implement this operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// No blade with the given serial in this chassis.
    #[error("blade with serial '{0}' not found")]
    BladeNotFound(String),

    /// An external tool returned an unexpected result.
    #[error("{command} failed: {message}: {output:?}")]
    CommandFailed {
        /// Command that was run
        command: String,
        /// Exit status or reason
        message: String,
        /// Combined output of the tool
        output: String,
    },
}

impl DriverError {
    /// Create a connection failure.
    pub fn connection(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            host: host.into(),
            message: message.into(),
        }
    }

    /// True when the native driver cannot handle this device at all and a
    /// generic protocol should be tried instead.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedHardware(_) | Self::VendorNotSupported(_)
        )
    }
}

/// Username and password for a management controller.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Login name
    pub username: String,
    password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The password. Never logged.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where and how to reach a management controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Controller address
    pub host: String,
    /// Login credentials
    pub credentials: Credentials,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(host: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            credentials,
        }
    }
}

/// A captured console image.
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Raw image bytes
    pub payload: Vec<u8>,
    /// File extension without the dot, e.g. `png`
    pub extension: String,
    /// Hardware type reported by the driver, used in the file name
    pub hardware_type: String,
}

/// Operations on a standalone server controller.
#[async_trait]
pub trait HostDriver: Send + Sync {
    /// Report whether the server is powered on.
    async fn is_on(&self) -> DriverResult<bool>;

    /// Power the server on.
    async fn power_on(&self) -> DriverResult<bool>;

    /// Power the server off.
    async fn power_off(&self) -> DriverResult<bool>;

    /// Power-cycle the server.
    async fn power_cycle(&self) -> DriverResult<bool>;

    /// Reset the controller itself.
    async fn power_cycle_bmc(&self) -> DriverResult<bool>;

    /// Boot from the network on next start.
    async fn pxe_once(&self) -> DriverResult<bool>;

    /// Boot from the network on next start in legacy mode.
    async fn pxe_once_mbr(&self) -> DriverResult<bool> {
        Err(DriverError::NotSupported("pxeoncembr".into()))
    }

    /// Boot from the network on next start in UEFI mode.
    async fn pxe_once_efi(&self) -> DriverResult<bool> {
        Err(DriverError::NotSupported("pxeonceefi".into()))
    }

    /// Capture the console. Returns the image and its file extension.
    async fn screenshot(&self) -> DriverResult<(Vec<u8>, String)>;

    /// Hardware type string, e.g. `idrac9`.
    fn hardware_type(&self) -> String;

    /// Release the session.
    async fn close(&self) -> DriverResult<()>;
}

/// Operations on a blade chassis controller as a whole.
#[async_trait]
pub trait ChassisDriver: Send + Sync {
    /// Report whether the chassis is powered on.
    async fn is_on(&self) -> DriverResult<bool>;

    /// Power the chassis on.
    async fn power_on(&self) -> DriverResult<bool>;

    /// Power-cycle the chassis.
    async fn power_cycle(&self) -> DriverResult<bool>;

    /// Release the session.
    async fn close(&self) -> DriverResult<()>;
}

/// Per-slot operations, addressed through the chassis controller.
#[async_trait]
pub trait BladeDriver: Send + Sync {
    /// Report whether the blade in `position` is powered on.
    async fn is_on_blade(&self, position: i32) -> DriverResult<bool>;

    /// Power on the blade in `position`.
    async fn power_on_blade(&self, position: i32) -> DriverResult<bool>;

    /// Power off the blade in `position`.
    async fn power_off_blade(&self, position: i32) -> DriverResult<bool>;

    /// Power-cycle the blade in `position`.
    async fn power_cycle_blade(&self, position: i32) -> DriverResult<bool>;

    /// Reset the controller of the blade in `position`.
    async fn power_cycle_bmc_blade(&self, position: i32) -> DriverResult<bool>;

    /// Physically reseat the blade in `position`.
    async fn reseat_blade(&self, position: i32) -> DriverResult<bool>;

    /// Network boot the blade in `position` on next start.
    async fn pxe_once_blade(&self, position: i32) -> DriverResult<bool>;

    /// Find the slot holding the blade with this serial.
    async fn find_blade_position(&self, serial: &str) -> DriverResult<i32>;

    /// Release the session.
    async fn close(&self) -> DriverResult<()>;
}

/// Everything a chassis controller handle must offer.
pub trait ChassisManagement: ChassisDriver + BladeDriver {}

impl<T: ChassisDriver + BladeDriver + ?Sized> ChassisManagement for T {}

/// Opens native driver sessions.
///
/// Implementations detect the device type behind the endpoint and return
/// [`DriverError::UnsupportedHardware`] or [`DriverError::VendorNotSupported`]
/// for devices they do not handle.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a session to a standalone server controller.
    async fn connect_host(&self, endpoint: &Endpoint) -> DriverResult<Arc<dyn HostDriver>>;

    /// Open a session to a chassis controller.
    async fn connect_chassis(
        &self,
        endpoint: &Endpoint,
    ) -> DriverResult<Arc<dyn ChassisManagement>>;
}

/// Opens the generic protocol session used when the native driver declines a
/// server.
#[async_trait]
pub trait HostFallback: Send + Sync {
    /// Open a session to a standalone server controller.
    async fn connect(&self, endpoint: &Endpoint) -> DriverResult<Arc<dyn HostDriver>>;
}

/// Connector used when no native driver is linked in.
///
/// Servers report unsupported hardware so every server goes through the
/// fallback. Chassis cannot be managed without a native driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNativeDriver;

#[async_trait]
impl Connector for NoNativeDriver {
    async fn connect_host(&self, endpoint: &Endpoint) -> DriverResult<Arc<dyn HostDriver>> {
        Err(DriverError::UnsupportedHardware(format!(
            "no native driver available for {}",
            endpoint.host
        )))
    }

    async fn connect_chassis(
        &self,
        endpoint: &Endpoint,
    ) -> DriverResult<Arc<dyn ChassisManagement>> {
        Err(DriverError::UnsupportedHardware(format!(
            "no native chassis driver available for {}",
            endpoint.host
        )))
    }
}
