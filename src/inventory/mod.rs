//! Inventory of the packages the dependency manager has installed.
//!
//! An [`InventorySource`] yields raw [`PackageDescriptor`]s; an
//! [`InventorySnapshot`] turns them into the name → install path mapping that
//! reconciliation works from.

mod installed_json;
mod snapshot;

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use installed_json::InstalledJsonSource;
pub use snapshot::{InventoryEntry, InventorySnapshot};

/// A package as reported by the dependency manager.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    pub name: String,

    /// Where the package lives. Absent or empty for metapackages.
    #[serde(default, rename = "install-path")]
    pub install_path: Option<PathBuf>,

    /// The real package when this descriptor is an alias.
    #[serde(default, rename = "alias-of")]
    pub alias_of: Option<Box<PackageDescriptor>>,
}

impl PackageDescriptor {
    pub fn new(name: impl Into<String>, install_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            install_path: Some(install_path.into()),
            alias_of: None,
        }
    }

    /// A metapackage: nothing on disk.
    pub fn meta(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            install_path: None,
            alias_of: None,
        }
    }

    pub fn alias(name: impl Into<String>, target: PackageDescriptor) -> Self {
        Self {
            name: name.into(),
            install_path: None,
            alias_of: Some(Box::new(target)),
        }
    }

    /// Follow the alias chain down to the real package.
    pub fn resolve(&self) -> &PackageDescriptor {
        let mut current = self;
        while let Some(target) = current.alias_of.as_deref() {
            current = target;
        }
        current
    }

    /// Install path, or `None` for metapackages.
    pub fn path(&self) -> Option<&Path> {
        self.install_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// Source of the dependency manager's installed package list.
#[cfg_attr(test, mockall::automock)]
pub trait InventorySource {
    fn list_installed_packages(&self) -> Result<Vec<PackageDescriptor>>;
}
