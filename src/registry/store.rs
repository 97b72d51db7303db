//! File-backed registry.
//!
//! Records are stored as `{"packages": [{name, install_path, installer}, ...]}`.
//! State and load errors are not persisted; they are recomputed from the
//! package directories each time the registry is opened.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, normalize_path};

use super::{PackageRecord, PackageRegistry, RegistryError, inspect_package_dir};

#[derive(Serialize, Deserialize, Debug, Default)]
struct StoredRegistry {
    #[serde(default)]
    packages: Vec<StoredRecord>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct StoredRecord {
    name: String,
    install_path: PathBuf,
    installer: String,
}

impl From<&PackageRecord> for StoredRecord {
    fn from(record: &PackageRecord) -> Self {
        StoredRecord {
            name: record.name.clone(),
            install_path: record.install_path.clone(),
            installer: record.installer.clone(),
        }
    }
}

/// Registry persisted as a single JSON file.
pub struct JsonRegistry<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
    manifest: String,
    records: Vec<PackageRecord>,
    /// Stored entries whose name was already taken, written back untouched.
    shadowed: Vec<StoredRecord>,
    dirty: bool,
}

impl<'a, R: Runtime> JsonRegistry<'a, R> {
    /// Open the registry at `path`, validating every stored record.
    ///
    /// A missing file is an empty registry.
    #[tracing::instrument(skip(runtime))]
    pub fn open(runtime: &'a R, path: &Path, manifest: &str) -> Result<Self> {
        let mut registry = Self {
            runtime,
            path: path.to_path_buf(),
            manifest: manifest.to_string(),
            records: Vec::new(),
            shadowed: Vec::new(),
            dirty: false,
        };

        if !runtime.exists(path) {
            debug!("No registry at {:?}, starting empty", path);
            return Ok(registry);
        }

        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read registry {:?}", path))?;
        let stored: StoredRegistry = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry {:?}", path))?;

        for entry in stored.packages {
            if registry.records.iter().any(|r| r.name == entry.name) {
                warn!(
                    "Ignoring duplicate registry entry for {} at {:?} in {:?}",
                    entry.name, entry.install_path, path
                );
                registry.shadowed.push(entry);
                continue;
            }
            let errors = inspect_package_dir(
                runtime,
                &entry.name,
                &entry.install_path,
                &registry.manifest,
            );
            registry.records.push(
                PackageRecord::new(entry.name, entry.install_path, entry.installer)
                    .with_load_errors(errors),
            );
        }

        debug!("Loaded {} record(s) from {:?}", registry.records.len(), path);
        Ok(registry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are mutations not yet written by [`save`](Self::save).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the registry back to disk if it changed.
    ///
    /// The file is written next to the target and renamed into place.
    #[tracing::instrument(skip(self))]
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let stored = StoredRegistry {
            packages: self
                .records
                .iter()
                .map(StoredRecord::from)
                .chain(self.shadowed.iter().cloned())
                .collect(),
        };
        let content = serde_json::to_string_pretty(&stored)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        self.runtime
            .write(&tmp, content.as_bytes())
            .with_context(|| format!("Failed to write registry to {:?}", tmp))?;
        self.runtime
            .rename(&tmp, &self.path)
            .with_context(|| format!("Failed to save registry to {:?}", self.path))?;

        self.dirty = false;
        debug!("Saved {} record(s) to {:?}", self.records.len(), self.path);
        Ok(())
    }
}

impl<R: Runtime> PackageRegistry for JsonRegistry<'_, R> {
    fn records(&self) -> Vec<PackageRecord> {
        self.records.clone()
    }

    fn get(&self, name: &str) -> Option<PackageRecord> {
        self.records.iter().find(|r| r.name == name).cloned()
    }

    fn install(&mut self, path: &Path, name: &str, installer: &str) -> Result<(), RegistryError> {
        if let Some(existing) = self.records.iter().find(|r| r.name == name) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
                path: existing.install_path.clone(),
            });
        }

        let path = normalize_path(path);
        if let Some(other) = self.records.iter().find(|r| r.install_path == path) {
            return Err(RegistryError::Conflict {
                name: name.to_string(),
                other: other.name.clone(),
                path,
            });
        }

        let errors = inspect_package_dir(self.runtime, name, &path, &self.manifest);
        if let Some(first) = errors.first() {
            if first.kind == super::LoadErrorKind::NotFound {
                return Err(RegistryError::NotFound { path });
            }
            return Err(RegistryError::Malformed {
                name: name.to_string(),
                path,
                causes: errors,
            });
        }

        self.records.push(PackageRecord::new(name, path, installer));
        self.dirty = true;
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<(), RegistryError> {
        let index = self
            .records
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))?;
        self.records.remove(index);
        self.dirty = true;
        Ok(())
    }
}
