//! Shared test utilities and fixtures for the bmc-actor test suite.
//!
//! This module provides:
//! - Scriptable server and chassis drivers that record every call
//! - A connector and a fallback that count connection attempts
//! - An in-memory screenshot store
//! - Helpers for building engines and parameters
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use bmc_actor::driver::{
    BladeDriver, ChassisDriver, ChassisManagement, Connector, Credentials, DriverError,
    DriverResult, Endpoint, HostDriver, HostFallback,
};
use bmc_actor::engine::Engine;
use bmc_actor::executor::Params;
use bmc_actor::screenshot::{ScreenshotStore, StoreError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Credentials used by every test engine.
pub fn test_credentials() -> Credentials {
    Credentials::new("admin", "secret")
}

/// Build a parameter map from string pairs.
pub fn params(entries: &[(&str, &str)]) -> Params {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

/// Build an engine around the given connector, fallback and store.
pub fn engine(
    connector: Arc<MockConnector>,
    fallback: Arc<MockFallback>,
    store: Arc<MemoryStore>,
) -> Engine {
    Engine::builder(test_credentials(), connector)
        .fallback(fallback)
        .store(store)
        .build()
}

fn failure(operation: &str) -> DriverError {
    DriverError::Operation(format!("{operation} failed"))
}

// ============================================================================
// Mock Server Driver
// ============================================================================

/// A server driver that records every call and fails on request.
pub struct MockHostDriver {
    hardware: String,
    powered: AtomicBool,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<&'static str>>,
    screenshot: Option<(Vec<u8>, String)>,
    closes: AtomicUsize,
}

impl MockHostDriver {
    /// A powered-on server reporting `hardware` as its type.
    pub fn new(hardware: &str) -> Self {
        Self {
            hardware: hardware.to_string(),
            powered: AtomicBool::new(true),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            screenshot: None,
            closes: AtomicUsize::new(0),
        }
    }

    /// Make `operation` fail from now on.
    pub fn failing(self, operation: &'static str) -> Self {
        self.failing.lock().insert(operation);
        self
    }

    /// Return this image from `screenshot`.
    pub fn with_screenshot(mut self, payload: &[u8], extension: &str) -> Self {
        self.screenshot = Some((payload.to_vec(), extension.to_string()));
        self
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }

    /// Number of times `close` was called.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, operation: &'static str) -> DriverResult<()> {
        self.calls.lock().push(operation);
        if self.failing.lock().contains(operation) {
            return Err(failure(operation));
        }
        Ok(())
    }
}

#[async_trait]
impl HostDriver for MockHostDriver {
    async fn is_on(&self) -> DriverResult<bool> {
        self.record("is_on")?;
        Ok(self.powered.load(Ordering::SeqCst))
    }

    async fn power_on(&self) -> DriverResult<bool> {
        self.record("power_on")?;
        self.powered.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn power_off(&self) -> DriverResult<bool> {
        self.record("power_off")?;
        self.powered.store(false, Ordering::SeqCst);
        Ok(true)
    }

    async fn power_cycle(&self) -> DriverResult<bool> {
        self.record("power_cycle")?;
        Ok(true)
    }

    async fn power_cycle_bmc(&self) -> DriverResult<bool> {
        self.record("power_cycle_bmc")?;
        Ok(true)
    }

    async fn pxe_once(&self) -> DriverResult<bool> {
        self.record("pxe_once")?;
        Ok(true)
    }

    async fn pxe_once_mbr(&self) -> DriverResult<bool> {
        self.record("pxe_once_mbr")?;
        Ok(true)
    }

    async fn pxe_once_efi(&self) -> DriverResult<bool> {
        self.record("pxe_once_efi")?;
        Ok(true)
    }

    async fn screenshot(&self) -> DriverResult<(Vec<u8>, String)> {
        self.record("screenshot")?;
        self.screenshot
            .clone()
            .ok_or_else(|| DriverError::NotSupported("screenshot".into()))
    }

    fn hardware_type(&self) -> String {
        self.hardware.clone()
    }

    async fn close(&self) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Mock Chassis Driver
// ============================================================================

/// A chassis driver with a fixed blade inventory.
pub struct MockChassis {
    blades: HashMap<String, i32>,
    lookup_latency: Duration,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<(&'static str, Option<i32>)>>,
    lookups: AtomicUsize,
    closes: AtomicUsize,
}

impl MockChassis {
    /// A chassis holding the given `(serial, slot)` blades.
    pub fn new(blades: &[(&str, i32)]) -> Self {
        Self {
            blades: blades.iter().map(|(s, p)| (s.to_string(), *p)).collect(),
            lookup_latency: Duration::ZERO,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            lookups: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        }
    }

    /// Make serial lookups take `latency`.
    pub fn with_lookup_latency(mut self, latency: Duration) -> Self {
        self.lookup_latency = latency;
        self
    }

    /// Make `operation` fail from now on.
    pub fn failing(self, operation: &'static str) -> Self {
        self.failing.lock().insert(operation);
        self
    }

    /// Operations called so far with the slot they addressed.
    pub fn calls(&self) -> Vec<(&'static str, Option<i32>)> {
        self.calls.lock().clone()
    }

    /// Number of serial lookups that reached the driver.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of times `close` was called.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, operation: &'static str, position: Option<i32>) -> DriverResult<bool> {
        self.calls.lock().push((operation, position));
        if self.failing.lock().contains(operation) {
            return Err(failure(operation));
        }
        Ok(true)
    }
}

#[async_trait]
impl ChassisDriver for MockChassis {
    async fn is_on(&self) -> DriverResult<bool> {
        self.record("is_on", None)
    }

    async fn power_on(&self) -> DriverResult<bool> {
        self.record("power_on", None)
    }

    async fn power_cycle(&self) -> DriverResult<bool> {
        self.record("power_cycle", None)
    }

    async fn close(&self) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BladeDriver for MockChassis {
    async fn is_on_blade(&self, position: i32) -> DriverResult<bool> {
        self.record("is_on_blade", Some(position))
    }

    async fn power_on_blade(&self, position: i32) -> DriverResult<bool> {
        self.record("power_on_blade", Some(position))
    }

    async fn power_off_blade(&self, position: i32) -> DriverResult<bool> {
        self.record("power_off_blade", Some(position))
    }

    async fn power_cycle_blade(&self, position: i32) -> DriverResult<bool> {
        self.record("power_cycle_blade", Some(position))
    }

    async fn power_cycle_bmc_blade(&self, position: i32) -> DriverResult<bool> {
        self.record("power_cycle_bmc_blade", Some(position))
    }

    async fn reseat_blade(&self, position: i32) -> DriverResult<bool> {
        self.record("reseat_blade", Some(position))
    }

    async fn pxe_once_blade(&self, position: i32) -> DriverResult<bool> {
        self.record("pxe_once_blade", Some(position))
    }

    async fn find_blade_position(&self, serial: &str) -> DriverResult<i32> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.lookup_latency.is_zero() {
            tokio::time::sleep(self.lookup_latency).await;
        }
        self.blades
            .get(serial)
            .copied()
            .ok_or_else(|| DriverError::BladeNotFound(serial.to_string()))
    }

    async fn close(&self) -> DriverResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// Mock Connector
// ============================================================================

/// A native driver connector handing out shared mock sessions.
pub struct MockConnector {
    host: Option<Arc<MockHostDriver>>,
    chassis: Option<Arc<MockChassis>>,
    host_error: Option<DriverError>,
    transient_failures: AtomicUsize,
    latency: Duration,
    host_connects: AtomicUsize,
    chassis_connects: AtomicUsize,
}

impl MockConnector {
    /// A connector that declines everything as unsupported hardware.
    pub fn new() -> Self {
        Self {
            host: None,
            chassis: None,
            host_error: None,
            transient_failures: AtomicUsize::new(0),
            latency: Duration::ZERO,
            host_connects: AtomicUsize::new(0),
            chassis_connects: AtomicUsize::new(0),
        }
    }

    /// Serve servers with `driver`.
    pub fn with_host(mut self, driver: Arc<MockHostDriver>) -> Self {
        self.host = Some(driver);
        self
    }

    /// Serve chassis with `driver`.
    pub fn with_chassis(mut self, driver: Arc<MockChassis>) -> Self {
        self.chassis = Some(driver);
        self
    }

    /// Fail every server connect with `error`.
    pub fn with_host_error(mut self, error: DriverError) -> Self {
        self.host_error = Some(error);
        self
    }

    /// Fail the first `count` connects with a connection error.
    pub fn with_transient_failures(self, count: usize) -> Self {
        self.transient_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Delay every connect by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Server connects attempted so far.
    pub fn host_connects(&self) -> usize {
        self.host_connects.load(Ordering::SeqCst)
    }

    /// Chassis connects attempted so far.
    pub fn chassis_connects(&self) -> usize {
        self.chassis_connects.load(Ordering::SeqCst)
    }

    async fn gate(&self, endpoint: &Endpoint) -> DriverResult<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let remaining = self.transient_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.transient_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(DriverError::connection(&endpoint.host, "connection refused"));
        }
        Ok(())
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect_host(&self, endpoint: &Endpoint) -> DriverResult<Arc<dyn HostDriver>> {
        self.host_connects.fetch_add(1, Ordering::SeqCst);
        self.gate(endpoint).await?;
        if let Some(err) = &self.host_error {
            return Err(err.clone());
        }
        match &self.host {
            Some(driver) => Ok(Arc::clone(driver) as Arc<dyn HostDriver>),
            None => Err(DriverError::UnsupportedHardware(endpoint.host.clone())),
        }
    }

    async fn connect_chassis(
        &self,
        endpoint: &Endpoint,
    ) -> DriverResult<Arc<dyn ChassisManagement>> {
        self.chassis_connects.fetch_add(1, Ordering::SeqCst);
        self.gate(endpoint).await?;
        match &self.chassis {
            Some(driver) => Ok(Arc::clone(driver) as Arc<dyn ChassisManagement>),
            None => Err(DriverError::UnsupportedHardware(endpoint.host.clone())),
        }
    }
}

// ============================================================================
// Mock Fallback
// ============================================================================

/// A fallback that hands out one shared mock server driver.
pub struct MockFallback {
    driver: Arc<MockHostDriver>,
    connects: AtomicUsize,
}

impl MockFallback {
    /// Serve every fallback connect with `driver`.
    pub fn new(driver: Arc<MockHostDriver>) -> Self {
        Self {
            driver,
            connects: AtomicUsize::new(0),
        }
    }

    /// Connects made so far.
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostFallback for MockFallback {
    async fn connect(&self, _endpoint: &Endpoint) -> DriverResult<Arc<dyn HostDriver>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.driver) as Arc<dyn HostDriver>)
    }
}

// ============================================================================
// In-memory Screenshot Store
// ============================================================================

/// Keeps screenshots in memory and returns `mem://<file name>`.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStore {
    /// Everything persisted so far.
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl ScreenshotStore for MemoryStore {
    async fn persist(&self, payload: Vec<u8>, file_name: &str) -> Result<String, StoreError> {
        self.saved.lock().push((file_name.to_string(), payload));
        Ok(format!("mem://{file_name}"))
    }
}
