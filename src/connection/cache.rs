//! Serial-to-slot cache for blades addressed by serial number.

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::driver::DriverResult;

/// Remembers which chassis slot holds which blade serial.
///
/// Lookups against the chassis are slow, so each serial is resolved once per
/// cache. Concurrent misses for the same serial are serialized on the write
/// lock and re-checked, so the chassis is asked only once. Failed lookups are
/// not remembered.
#[derive(Debug, Default)]
pub struct BladePositionCache {
    positions: RwLock<HashMap<String, i32>>,
}

impl BladePositionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached position for `serial`, running `lookup` on a miss.
    pub async fn resolve<F, Fut>(&self, serial: &str, lookup: F) -> DriverResult<i32>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DriverResult<i32>>,
    {
        let cached = self.positions.read().await.get(serial).copied();
        if let Some(position) = cached {
            trace!(serial, position, "blade position cache hit");
            return Ok(position);
        }

        let mut positions = self.positions.write().await;
        if let Some(&position) = positions.get(serial) {
            return Ok(position);
        }
        let position = lookup().await?;
        debug!(serial, position, "cached blade position");
        positions.insert(serial.to_string(), position);
        Ok(position)
    }

    /// Cached position for `serial`, without looking it up.
    pub async fn get(&self, serial: &str) -> Option<i32> {
        self.positions.read().await.get(serial).copied()
    }

    /// Number of cached serials.
    pub async fn len(&self) -> usize {
        self.positions.read().await.len()
    }

    /// True when nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.positions.read().await.is_empty()
    }
}
