use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::runtime::{Runtime, resolve_relative_path};

use super::{InventorySource, PackageDescriptor};

#[derive(Deserialize)]
#[serde(untagged)]
enum InstalledFile {
    Wrapped { packages: Vec<PackageDescriptor> },
    Bare(Vec<PackageDescriptor>),
}

/// Reads the dependency manager's `installed.json`.
///
/// Relative install paths are resolved against the directory holding the file.
pub struct InstalledJsonSource<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> InstalledJsonSource<'a, R> {
    pub fn new(runtime: &'a R, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn absolutize(descriptor: &mut PackageDescriptor, base: &Path) {
    if let Some(path) = descriptor.install_path.as_mut()
        && !path.as_os_str().is_empty()
    {
        *path = resolve_relative_path(base, path);
    }
    if let Some(target) = descriptor.alias_of.as_deref_mut() {
        absolutize(target, base);
    }
}

impl<R: Runtime> InventorySource for InstalledJsonSource<'_, R> {
    #[tracing::instrument(skip(self))]
    fn list_installed_packages(&self) -> Result<Vec<PackageDescriptor>> {
        let content = self
            .runtime
            .read_to_string(&self.path)
            .with_context(|| format!("Failed to read inventory {:?}", self.path))?;
        let file: InstalledFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse inventory {:?}", self.path))?;

        let mut packages = match file {
            InstalledFile::Wrapped { packages } => packages,
            InstalledFile::Bare(packages) => packages,
        };

        let base = self.path.parent().unwrap_or_else(|| Path::new(""));
        for package in &mut packages {
            absolutize(package, base);
        }

        Ok(packages)
    }
}
