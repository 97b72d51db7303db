//! Package registry
//!
//! The registry is the persisted set of [`PackageRecord`]s. Reconciliation only
//! talks to it through [`PackageRegistry`]; [`JsonRegistry`] is the file-backed
//! store used by the binary.

mod error;
mod record;
mod store;
mod validate;

use std::path::Path;

pub use error::RegistryError;
pub use record::{LoadError, LoadErrorKind, PackageRecord, PackageState};
pub use store::JsonRegistry;
pub use validate::inspect_package_dir;

/// Storage contract for package records keyed by name.
#[cfg_attr(test, mockall::automock)]
pub trait PackageRegistry {
    /// All records, in registration order.
    fn records(&self) -> Vec<PackageRecord>;

    fn get(&self, name: &str) -> Option<PackageRecord>;

    /// Register the package found at `path` under `name`, tagged with `installer`.
    fn install(&mut self, path: &Path, name: &str, installer: &str) -> Result<(), RegistryError>;

    fn remove(&mut self, name: &str) -> Result<(), RegistryError>;
}

/// Queries derived from [`PackageRegistry::records`].
pub trait RegistryExt: PackageRegistry {
    fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    fn find_by<P>(&self, predicate: P) -> Vec<PackageRecord>
    where
        P: Fn(&PackageRecord) -> bool,
    {
        self.records().into_iter().filter(|r| predicate(r)).collect()
    }
}

impl<T: PackageRegistry + ?Sized> RegistryExt for T {}
