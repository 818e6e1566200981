use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{self, Receiver};
use tokio::time::{Instant, timeout_at};

use super::CatalogError;

const DEBOUNCE: Duration = Duration::from_secs(1);

pub enum CatalogEvent {
    /// One or more catalog files changed. Emitted once per debounce window.
    Changed(Vec<PathBuf>),
    Error(String),
}

/// Watches catalog files for changes.
///
/// The parent directories are watched rather than the files themselves so
/// that editors which save by replacing the file are still picked up.
pub struct CatalogWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    files: Vec<PathBuf>,
}

impl CatalogWatcher {
    pub fn new(files: &[PathBuf]) -> Result<Self, CatalogError> {
        let (tx, rx) = mpsc::channel(100);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.blocking_send(res);
            },
            Config::default(),
        )
        .map_err(CatalogError::InitWatcher)?;

        let mut dirs: Vec<PathBuf> = files.iter().map(|f| watch_dir(f)).collect();
        dirs.sort();
        dirs.dedup();
        for dir in &dirs {
            watcher
                .watch(dir, RecursiveMode::NonRecursive)
                .map_err(|source| CatalogError::WatchPath {
                    path: dir.clone(),
                    source,
                })?;
        }

        tracing::info!(files = files.len(), dirs = dirs.len(), "Catalog watcher started");
        Ok(Self {
            _watcher: watcher,
            rx,
            files: files.to_vec(),
        })
    }

    /// Wait for the next change to a watched catalog. Returns `None` once the
    /// underlying watcher is gone.
    pub async fn next_event(&mut self) -> Option<CatalogEvent> {
        let mut changed = loop {
            match self.rx.recv().await? {
                Ok(event) => {
                    let hits = self.matching(&event);
                    if !hits.is_empty() {
                        break hits;
                    }
                }
                Err(e) => return Some(CatalogEvent::Error(format!("Catalog watcher error: {e}"))),
            }
        };

        // Swallow the burst of events a single save produces.
        let deadline = Instant::now() + DEBOUNCE;
        while let Ok(Some(res)) = timeout_at(deadline, self.rx.recv()).await {
            if let Ok(event) = res {
                for path in self.matching(&event) {
                    if !changed.contains(&path) {
                        changed.push(path);
                    }
                }
            }
        }

        tracing::debug!(count = changed.len(), "Catalog files changed");
        Some(CatalogEvent::Changed(changed))
    }

    fn matching(&self, event: &Event) -> Vec<PathBuf> {
        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return Vec::new();
        }
        self.files
            .iter()
            .filter(|f| event.paths.iter().any(|p| same_file(p, f)))
            .cloned()
            .collect()
    }
}

fn watch_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn same_file(event_path: &Path, watched: &Path) -> bool {
    if event_path == watched {
        return true;
    }
    match (event_path.file_name(), watched.file_name()) {
        (Some(a), Some(b)) if a == b => {
            let canon = |p: &Path| p.parent().and_then(|d| d.canonicalize().ok());
            canon(event_path) == canon(watched)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_dir_of_bare_file_name() {
        assert_eq!(watch_dir(Path::new("rewards.toml")), PathBuf::from("."));
        assert_eq!(
            watch_dir(Path::new("/etc/bossfall/rewards.toml")),
            PathBuf::from("/etc/bossfall")
        );
    }

    #[test]
    fn test_same_file_matches_relative_and_absolute() {
        let dir = std::env::temp_dir();
        let absolute = dir.join("bossfall-watch.toml");
        assert!(same_file(&absolute, &absolute));
        assert!(same_file(&dir.join(".").join("bossfall-watch.toml"), &absolute));
        assert!(!same_file(&dir.join("other.toml"), &absolute));
    }
}
