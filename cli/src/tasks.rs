//! Background tasks: the spawn clock and the catalog watcher.

use bossfall_core::{BossEngine, CatalogEvent, CatalogWatcher, SharedRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::CliContext;
use crate::commands;
use crate::observer::RandomObserver;

/// Tick every zone once per `tick_interval_secs`.
pub fn start_ticker(ctx: &CliContext) -> JoinHandle<()> {
    let engine = Arc::clone(&ctx.engine);
    let period = Duration::from_secs(engine.spawn_settings().tick_interval_secs.max(1));

    tokio::spawn(async move {
        let observer = RandomObserver::new(SharedRng::from_entropy());
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            for event in engine.tick_all(&observer) {
                commands::print_spawn(&event);
            }
        }
    })
}

/// Reload catalogs whenever their files change. Only started when the
/// configuration enables watching and names at least one catalog file.
pub fn start_catalog_watcher(ctx: &CliContext) -> Option<JoinHandle<()>> {
    let engine = Arc::clone(&ctx.engine);
    if !engine.config().catalog.watch {
        return None;
    }
    let paths = engine.catalog_paths();
    if paths.is_empty() {
        println!("Catalog watching enabled but no catalog files configured");
        return None;
    }

    let mut watcher = match CatalogWatcher::new(&paths) {
        Ok(w) => w,
        Err(e) => {
            println!("Failed to start catalog watcher: {e}");
            return None;
        }
    };

    for path in &paths {
        println!("Watching catalog: {}", path.display());
    }

    Some(tokio::spawn(async move {
        while let Some(event) = watcher.next_event().await {
            match event {
                CatalogEvent::Changed(changed) => {
                    for path in &changed {
                        println!("Catalog changed: {}", path.display());
                    }
                    reload(Arc::clone(&engine)).await;
                }
                CatalogEvent::Error(err) => println!("Error: {err}"),
            }
        }
    }))
}

/// Re-read catalogs off the async runtime and print the result.
pub async fn reload(engine: Arc<BossEngine>) {
    match tokio::task::spawn_blocking(move || engine.reload_catalogs()).await {
        Ok(Ok(summary)) => commands::print_reload(&summary),
        Ok(Err(e)) => println!("Reload failed, keeping current catalogs: {e}"),
        Err(e) => tracing::error!(error = %e, "Catalog reload task failed"),
    }
}
