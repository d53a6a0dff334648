//! Wiring of plan makers for every target kind.

use std::sync::Arc;

use crate::config::Config;
use crate::connection::IpmiFallback;
use crate::driver::{Connector, Credentials, HostFallback};
use crate::error::Result;
use crate::executor::{
    BladeByPositionExecutorFactory, BladeBySerialExecutorFactory, ChassisExecutorFactory,
    HostExecutorFactory, PlanMaker, SleepExecutorFactory, TargetKind,
};
use crate::screenshot::{self, ScreenshotStore};

/// One plan maker per target kind, sharing credentials and drivers.
#[derive(Clone)]
pub struct Engine {
    host: PlanMaker,
    chassis: PlanMaker,
    blade_by_position: PlanMaker,
    blade_by_serial: PlanMaker,
    sleep: PlanMaker,
}

impl Engine {
    /// Build from configuration with `native` as the native driver.
    pub fn from_config(config: &Config, native: Arc<dyn Connector>) -> Result<Self> {
        let fallback: Arc<dyn HostFallback> = Arc::new(IpmiFallback::new(
            config.ipmi.binary.clone(),
            config.ipmi.interface.clone(),
        ));
        let store = screenshot::store_from_config(config)?;
        Ok(Self::builder(config.bmc.credentials(), native)
            .fallback(fallback)
            .store(store)
            .build())
    }

    /// Start assembling an engine by hand.
    pub fn builder(credentials: Credentials, native: Arc<dyn Connector>) -> EngineBuilder {
        EngineBuilder {
            credentials,
            native,
            fallback: Arc::new(IpmiFallback::default()),
            store: None,
        }
    }

    /// The plan maker for `kind`.
    pub fn plan_maker(&self, kind: TargetKind) -> &PlanMaker {
        match kind {
            TargetKind::Host => &self.host,
            TargetKind::Chassis => &self.chassis,
            TargetKind::BladeByPosition => &self.blade_by_position,
            TargetKind::BladeBySerial => &self.blade_by_serial,
            TargetKind::Sleep => &self.sleep,
        }
    }
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    credentials: Credentials,
    native: Arc<dyn Connector>,
    fallback: Arc<dyn HostFallback>,
    store: Option<Arc<dyn ScreenshotStore>>,
}

impl EngineBuilder {
    /// Driver used when the native one declines a server.
    pub fn fallback(mut self, fallback: Arc<dyn HostFallback>) -> Self {
        self.fallback = fallback;
        self
    }

    /// Where screenshots go. Defaults to the local store with default settings.
    pub fn store(mut self, store: Arc<dyn ScreenshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Finish.
    pub fn build(self) -> Engine {
        let store = self.store.unwrap_or_else(|| {
            let defaults = crate::config::ScreenshotConfig::default();
            Arc::new(screenshot::LocalStore::new(
                &defaults.storage,
                &defaults.url_prefix,
            ))
        });
        Engine {
            host: PlanMaker::new(HostExecutorFactory::new(
                self.credentials.clone(),
                Arc::clone(&self.native),
                self.fallback,
                store,
            )),
            chassis: PlanMaker::new(ChassisExecutorFactory::new(
                self.credentials.clone(),
                Arc::clone(&self.native),
            )),
            blade_by_position: PlanMaker::new(BladeByPositionExecutorFactory::new(
                self.credentials.clone(),
                Arc::clone(&self.native),
            )),
            blade_by_serial: PlanMaker::new(BladeBySerialExecutorFactory::new(
                self.credentials,
                self.native,
            )),
            sleep: PlanMaker::new(SleepExecutorFactory),
        }
    }
}
