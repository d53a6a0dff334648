//! Shared API state.

use std::path::PathBuf;
use std::time::Instant;

use crate::engine::Engine;

/// State shared by all handlers.
pub struct AppState {
    /// Plan makers for every target kind
    pub engine: Engine,
    /// Directory served under the screenshot prefix
    pub screenshot_dir: PathBuf,
    /// URL prefix of stored screenshots
    pub screenshot_prefix: String,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create state around an engine.
    pub fn new(engine: Engine, screenshot_dir: PathBuf, screenshot_prefix: impl Into<String>) -> Self {
        Self {
            engine,
            screenshot_dir,
            screenshot_prefix: screenshot_prefix.into(),
            start_time: Instant::now(),
        }
    }

    /// Seconds since the state was created.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
