use anyhow::{Context, Result};
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{InventorySource, PackageDescriptor};

/// One installed package after alias resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryEntry {
    pub name: String,
    pub install_path: PathBuf,
}

/// Ordered mapping from package name to install path.
///
/// Order is the order in which names were first reported.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    entries: Vec<InventoryEntry>,
    index: HashMap<String, usize>,
}

impl InventorySnapshot {
    /// Build a snapshot from raw descriptors.
    ///
    /// Aliases are resolved to their target first. Metapackages are dropped.
    /// A name reported twice keeps its first position and takes the last path.
    pub fn from_descriptors<'d, I>(descriptors: I) -> Self
    where
        I: IntoIterator<Item = &'d PackageDescriptor>,
    {
        let mut snapshot = Self::default();

        for descriptor in descriptors {
            let package = descriptor.resolve();
            let Some(path) = package.path() else {
                debug!("Skipping metapackage {}", package.name);
                continue;
            };
            snapshot.insert(&package.name, path);
        }

        snapshot
    }

    /// Read the source once and build a snapshot from it.
    #[tracing::instrument(skip(source))]
    pub fn capture<S: InventorySource + ?Sized>(source: &S) -> Result<Self> {
        let descriptors = source
            .list_installed_packages()
            .context("Failed to read the installed package list")?;
        Ok(Self::from_descriptors(&descriptors))
    }

    fn insert(&mut self, name: &str, path: &Path) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].install_path = path.to_path_buf(),
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(InventoryEntry {
                    name: name.to_string(),
                    install_path: path.to_path_buf(),
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.index
            .get(name)
            .map(|&i| self.entries[i].install_path.as_path())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InventoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
