use bossfall_core::context::EngineConfigExt;
use bossfall_core::storage::default_history_path;
use bossfall_core::{BossEngine, EngineConfig, JsonLinesStore, OpenWorld};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

/// Handles for the long-running tasks started at launch.
#[derive(Default)]
pub struct BackgroundTasks {
    pub ticker: Option<JoinHandle<()>>,
    pub watcher: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn abort_all(&mut self) {
        for handle in [self.ticker.take(), self.watcher.take()].into_iter().flatten() {
            handle.abort();
        }
    }
}

/// Holds all shared state for the CLI application.
#[derive(Clone)]
pub struct CliContext {
    /// Persisted configuration. Edited by commands that save, read by `config`.
    pub config: Arc<RwLock<EngineConfig>>,
    pub engine: Arc<BossEngine>,
    /// Encounter history file. `None` if no location could be prepared.
    pub store: Option<Arc<JsonLinesStore>>,
    pub tasks: Arc<Mutex<BackgroundTasks>>,
}

impl CliContext {
    pub fn new() -> Self {
        let config = EngineConfig::load();
        let store = match config.catalog.history_path.clone() {
            Some(path) => Some(path),
            None => match default_history_path() {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!(error = %e, "Encounter history disabled");
                    None
                }
            },
        }
        .map(|path| Arc::new(JsonLinesStore::new(path)));

        let engine = BossEngine::new(config.clone(), Arc::new(OpenWorld));
        Self {
            config: Arc::new(RwLock::new(config)),
            engine: Arc::new(engine),
            store,
            tasks: Arc::new(Mutex::new(BackgroundTasks::default())),
        }
    }
}

impl Default for CliContext {
    fn default() -> Self {
        Self::new()
    }
}
