use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{EncounterStore, StorageError};
use crate::boss::BossId;
use crate::damage::FinalizedLedger;

/// Append-only JSON-lines file, one finalized ledger per line.
///
/// Writes are blocking file I/O; async callers should run them on a
/// blocking task.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn write_error(&self, source: std::io::Error) -> StorageError {
        StorageError::WriteFile {
            path: self.path.clone(),
            source,
        }
    }
}

impl EncounterStore for JsonLinesStore {
    fn save(&self, record: &FinalizedLedger) -> Result<(), StorageError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StorageError::OpenFile {
                path: self.path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .map_err(|e| self.write_error(e))?;

        tracing::debug!(boss_id = record.boss_id, path = %self.path.display(), "Encounter saved");
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<FinalizedLedger>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).map_err(|source| StorageError::OpenFile {
            path: self.path.clone(),
            source,
        })?;

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|source| StorageError::Decode {
                    path: self.path.clone(),
                    line: idx + 1,
                    source,
                })
            })
            .collect()
    }

    fn delete(&self, boss_id: BossId) -> Result<bool, StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let records = self.load_all()?;
        let before = records.len();
        let kept: Vec<&FinalizedLedger> = records.iter().filter(|r| r.boss_id != boss_id).collect();
        if kept.len() == before {
            return Ok(false);
        }

        let mut content = String::new();
        for record in kept {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content).map_err(|e| self.write_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.write_error(e))?;
        Ok(true)
    }
}
