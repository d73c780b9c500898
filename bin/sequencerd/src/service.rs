use crate::config::Config;
use crate::workers::{LoggingBundleWorker, LoggingOptimizerWorker};
use bridge_engine::BridgeEngine;
use bundle_engine::{BundleEngine, FixedRateTaxSystem};
use futures::future::join_all;
use sequencer_types::{EventSink, SystemClock};
use state_manager::{FileStateStore, StateManager};
use std::sync::Arc;
use tx_optimizer::Optimizer;

/// Wires the four engines together behind one shared event bus and clock,
/// and owns their background tasks for the lifetime of the process.
pub struct Service {
    bundle_engine: Arc<BundleEngine>,
    optimizer: Arc<Optimizer>,
    bridge_engine: Arc<BridgeEngine>,
    state_manager: Arc<StateManager>,
    events: EventSink,
}

impl Service {
    pub fn from(config: Config) -> anyhow::Result<Self> {
        let clock = Arc::new(SystemClock);
        let events = EventSink::default();

        let bundle_engine =
            BundleEngine::new(config.bundle_engine, Arc::new(FixedRateTaxSystem::new(0)), events.clone(), clock.clone(), Arc::new(LoggingBundleWorker));

        let optimizer = Optimizer::new(config.tx_optimizer, events.clone(), clock.clone(), Arc::new(LoggingOptimizerWorker));

        let bridge_engine = BridgeEngine::new(config.bridge_engine, events.clone(), clock.clone());

        let store = FileStateStore::open(&config.state_manager.log_path)?;
        let state_manager = Arc::new(StateManager::new(Box::new(store), clock));
        state_manager.initialize(&config.state_manager.root_identity)?;

        Ok(Self { bundle_engine, optimizer, bridge_engine, state_manager, events })
    }

    pub fn events(&self) -> EventSink {
        self.events.clone()
    }

    pub fn bundle_engine(&self) -> &Arc<BundleEngine> {
        &self.bundle_engine
    }

    pub fn optimizer(&self) -> &Arc<Optimizer> {
        &self.optimizer
    }

    pub fn bridge_engine(&self) -> &Arc<BridgeEngine> {
        &self.bridge_engine
    }

    pub fn state_manager(&self) -> &Arc<StateManager> {
        &self.state_manager
    }

    /// Runs every engine's periodic tick loop until cancelled. The Bridge
    /// Engine ticks itself (spawned in its constructor so `update_config`
    /// can restart it); Bundle Engine and Optimizer ticks are started here.
    pub async fn run(&self) {
        let tasks = vec![self.bundle_engine.clone().run_ticker(), self.optimizer.clone().run_ticker()];
        join_all(tasks).await;
    }
}
