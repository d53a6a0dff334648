//! IPMI fallback driver built on the `ipmitool` command line tool.
//!
//! Used for servers the native driver declines. Every operation is a single
//! `ipmitool` invocation whose combined output is matched against the phrase
//! the tool prints on success. The password travels in `IPMITOOL_PASSWORD`,
//! which is the only variable in the child environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::driver::{DriverError, DriverResult, Endpoint, HostDriver, HostFallback};

/// Directories searched when `ipmitool` is not on `PATH`.
const SEARCH_PATHS: &[&str] = &["/bin", "/sbin", "/usr/bin", "/usr/sbin", "/usr/local/sbin"];

const BINARY_NAME: &str = "ipmitool";
const PASSWORD_ENV: &str = "IPMITOOL_PASSWORD";

const POWER_IS_ON: &str = "Chassis Power is on";
const POWER_IS_OFF: &str = "Chassis Power is off";
const POWER_UP: &str = "Chassis Power Control: Up/On";
const POWER_DOWN: &str = "Chassis Power Control: Down/Off";
const POWER_RESET: &str = "Chassis Power Control: Reset";
const BMC_COLD_RESET: &str = "Sent cold reset command to MC";
const BOOTDEV_PXE: &str = "Set Boot Device to pxe";

/// Find the `ipmitool` binary.
///
/// An explicit path must exist. Otherwise `PATH` is consulted first, then a
/// fixed list of system directories.
pub fn locate_binary(explicit: Option<&Path>) -> DriverResult<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(DriverError::NotSupported(format!(
            "unable to find binary: {}",
            path.display()
        )));
    }

    if let Ok(path) = which::which(BINARY_NAME) {
        return Ok(path);
    }

    SEARCH_PATHS
        .iter()
        .map(|dir| Path::new(dir).join(BINARY_NAME))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| DriverError::NotSupported(format!("unable to find binary: {BINARY_NAME}")))
}

/// Interpret the output of `chassis power status`.
pub fn parse_power_status(output: &str) -> DriverResult<bool> {
    if output.contains(POWER_IS_ON) {
        Ok(true)
    } else if output.contains(POWER_IS_OFF) {
        Ok(false)
    } else {
        Err(DriverError::Operation(output.trim().to_string()))
    }
}

fn expect_phrase(output: &str, phrase: &str) -> DriverResult<bool> {
    if output.contains(phrase) {
        Ok(true)
    } else {
        Err(DriverError::Operation(output.trim().to_string()))
    }
}

/// A server controller driven through `ipmitool`.
#[derive(Debug, Clone)]
pub struct IpmiTool {
    endpoint: Endpoint,
    binary: PathBuf,
    interface: String,
}

impl IpmiTool {
    /// Create a driver for `endpoint` using the given binary and interface.
    pub fn new(endpoint: Endpoint, binary: impl Into<PathBuf>, interface: impl Into<String>) -> Self {
        Self {
            endpoint,
            binary: binary.into(),
            interface: interface.into(),
        }
    }

    /// The binary this driver runs.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Arguments for a command. The password is never part of them.
    pub fn args(&self, command: &[&str]) -> Vec<String> {
        let mut args = vec![
            "-I".to_string(),
            self.interface.clone(),
            "-U".to_string(),
            self.endpoint.credentials.username.clone(),
            "-E".to_string(),
            "-H".to_string(),
            self.endpoint.host.clone(),
        ];
        args.extend(command.iter().map(|s| s.to_string()));
        args
    }

    async fn run(&self, command: &[&str]) -> DriverResult<String> {
        let joined = command.join(" ");
        debug!(host = %self.endpoint.host, command = %joined, "running ipmitool");

        let output = Command::new(&self.binary)
            .args(self.args(command))
            .env_clear()
            .env(PASSWORD_ENV, self.endpoint.credentials.password())
            .output()
            .await
            .map_err(|e| DriverError::CommandFailed {
                command: joined.clone(),
                message: e.to_string(),
                output: String::new(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        trace!(host = %self.endpoint.host, output = %combined, "ipmitool output");

        if !output.status.success() {
            return Err(DriverError::CommandFailed {
                command: joined,
                message: output.status.to_string(),
                output: combined,
            });
        }
        Ok(combined)
    }

    async fn power_on_unchecked(&self) -> DriverResult<bool> {
        let output = self.run(&["chassis", "power", "on"]).await?;
        expect_phrase(&output, POWER_UP)
    }

    async fn pxe_then_cycle(&self, command: &[&str]) -> DriverResult<bool> {
        let output = self.run(command).await?;
        expect_phrase(&output, BOOTDEV_PXE)?;
        self.power_cycle().await
    }
}

#[async_trait]
impl HostDriver for IpmiTool {
    async fn is_on(&self) -> DriverResult<bool> {
        let output = self.run(&["chassis", "power", "status"]).await?;
        parse_power_status(&output)
    }

    async fn power_on(&self) -> DriverResult<bool> {
        if self.is_on().await? {
            return Err(DriverError::Operation("server is already on".into()));
        }
        self.power_on_unchecked().await
    }

    async fn power_off(&self) -> DriverResult<bool> {
        if !self.is_on().await? {
            return Err(DriverError::Operation("server is already off".into()));
        }
        let output = self.run(&["chassis", "power", "off"]).await?;
        expect_phrase(&output, POWER_DOWN)
    }

    async fn power_cycle(&self) -> DriverResult<bool> {
        let output = self.run(&["chassis", "power", "reset"]).await?;
        expect_phrase(&output, POWER_RESET)
    }

    async fn power_cycle_bmc(&self) -> DriverResult<bool> {
        let output = self.run(&["mc", "reset", "cold"]).await?;
        expect_phrase(&output, BMC_COLD_RESET)
    }

    async fn pxe_once(&self) -> DriverResult<bool> {
        self.pxe_once_efi().await
    }

    async fn pxe_once_mbr(&self) -> DriverResult<bool> {
        self.pxe_then_cycle(&["chassis", "bootdev", "pxe"]).await
    }

    async fn pxe_once_efi(&self) -> DriverResult<bool> {
        self.pxe_then_cycle(&["chassis", "bootdev", "pxe", "options=efiboot"])
            .await
    }

    async fn screenshot(&self) -> DriverResult<(Vec<u8>, String)> {
        Err(DriverError::NotSupported(
            "screenshot is not available over IPMI".into(),
        ))
    }

    fn hardware_type(&self) -> String {
        "ipmi".to_string()
    }

    async fn close(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// Opens [`IpmiTool`] sessions as the host fallback.
#[derive(Debug, Clone)]
pub struct IpmiFallback {
    binary: Option<PathBuf>,
    interface: String,
}

impl IpmiFallback {
    /// Create a fallback. `binary` pins the tool location; `None` searches.
    pub fn new(binary: Option<PathBuf>, interface: impl Into<String>) -> Self {
        Self {
            binary,
            interface: interface.into(),
        }
    }
}

impl Default for IpmiFallback {
    fn default() -> Self {
        Self::new(None, "lanplus")
    }
}

#[async_trait]
impl HostFallback for IpmiFallback {
    async fn connect(&self, endpoint: &Endpoint) -> DriverResult<Arc<dyn HostDriver>> {
        let binary = locate_binary(self.binary.as_deref())?;
        debug!(host = %endpoint.host, binary = %binary.display(), "using ipmitool fallback");
        Ok(Arc::new(IpmiTool::new(
            endpoint.clone(),
            binary,
            self.interface.clone(),
        )))
    }
}
