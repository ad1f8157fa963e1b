//! File-backed repository of pipeline specs.
//!
//! The registry file is one pretty-printed JSON object mapping pipeline name
//! to [`PipelineSpec`]. It is the single source of truth: every operation
//! re-reads it, and every mutation rewrites it completely by writing a
//! sibling `.tmp` file and renaming it over the original. Writers are not
//! isolated from each other; callers serialize mutations.

use super::spec::{LifecycleState, PipelineSpec, PipelineUpdate};
use crate::error::{PipesmithError, Result, ResultExt as _};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

type Entries = BTreeMap<String, PipelineSpec>;

/// Registry contents as read from disk.
struct Snapshot {
    entries: Entries,
    /// Set when the file existed but could not be parsed
    corrupted: bool,
}

#[derive(Debug, Clone)]
pub struct PipelineRegistry {
    path: PathBuf,
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

impl PipelineRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where an unreadable registry is copied before it is overwritten
    pub fn corrupt_backup_path(&self) -> PathBuf {
        sibling(&self.path, ".corrupt")
    }

    fn read(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            return Ok(Snapshot {
                entries: Entries::new(),
                corrupted: false,
            });
        }

        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read registry {}", self.path.display()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Snapshot {
                entries: Entries::new(),
                corrupted: false,
            });
        }

        match serde_json::from_slice::<Entries>(&bytes) {
            Ok(entries) => Ok(Snapshot {
                entries,
                corrupted: false,
            }),
            Err(e) => {
                let err = PipesmithError::RegistryLoadCorrupted {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                };
                tracing::warn!("{err}; treating registry as empty");
                Ok(Snapshot {
                    entries: Entries::new(),
                    corrupted: true,
                })
            }
        }
    }

    fn commit(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        if snapshot.corrupted {
            let backup = self.corrupt_backup_path();
            fs::copy(&self.path, &backup).with_context(|| {
                format!("Failed to back up corrupted registry to {}", backup.display())
            })?;
            tracing::warn!("Corrupted registry preserved at {}", backup.display());
        }

        let json = serde_json::to_string_pretty(&snapshot.entries)?;
        let temp_path = sibling(&self.path, ".tmp");
        fs::write(&temp_path, json)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            fs::copy(&temp_path, &self.path)
                .with_context(|| format!("Failed to replace registry (rename error: {e})"))?;
            let _ = fs::remove_file(&temp_path);
        }

        tracing::info!(
            "Saved {} pipeline configurations to {}",
            snapshot.entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// All entries keyed by name.
    pub fn load(&self) -> Result<BTreeMap<String, PipelineSpec>> {
        Ok(self.read()?.entries)
    }

    pub fn get(&self, name: &str) -> Result<PipelineSpec> {
        self.read()?
            .entries
            .remove(name)
            .ok_or_else(|| PipesmithError::PipelineNotFound(name.to_owned()))
    }

    /// Every spec, ordered by name.
    pub fn list(&self) -> Result<Vec<PipelineSpec>> {
        Ok(self.read()?.entries.into_values().collect())
    }

    pub fn contains(&self, name: &str) -> Result<bool> {
        Ok(self.read()?.entries.contains_key(name))
    }

    /// Register `spec`, replacing any entry with the same name. The stored
    /// copy is [`LifecycleState::Active`].
    pub fn insert(&self, mut spec: PipelineSpec) -> Result<PipelineSpec> {
        let mut snapshot = self.read()?;
        spec.state = LifecycleState::Active;
        if snapshot.entries.contains_key(&spec.name) {
            tracing::warn!("Overwriting existing pipeline '{}'", spec.name);
        }
        snapshot.entries.insert(spec.name.clone(), spec.clone());
        self.commit(&snapshot)?;
        Ok(spec)
    }

    /// Apply `update` to the named entry and persist it.
    pub fn update(&self, name: &str, update: PipelineUpdate) -> Result<PipelineSpec> {
        let mut snapshot = self.read()?;
        let spec = snapshot
            .entries
            .get_mut(name)
            .ok_or_else(|| PipesmithError::PipelineNotFound(name.to_owned()))?;
        update.apply(spec);
        let updated = spec.clone();
        self.commit(&snapshot)?;
        Ok(updated)
    }

    /// Remove the named entry and return it. A miss leaves the file untouched.
    pub fn remove(&self, name: &str) -> Result<PipelineSpec> {
        let mut snapshot = self.read()?;
        let removed = snapshot
            .entries
            .remove(name)
            .ok_or_else(|| PipesmithError::PipelineNotFound(name.to_owned()))?;
        self.commit(&snapshot)?;
        Ok(removed)
    }
}
