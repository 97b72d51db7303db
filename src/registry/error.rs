use std::path::PathBuf;
use thiserror::Error;

use super::{LoadError, LoadErrorKind};

/// Why the registry refused a single install or remove.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Package {name} is already registered at {}", path.display())]
    Duplicate { name: String, path: PathBuf },

    #[error("Package directory {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("Package {name} conflicts with {other}, already registered at {}", path.display())]
    Conflict {
        name: String,
        other: String,
        path: PathBuf,
    },

    #[error("Package {name} at {} is malformed", path.display())]
    Malformed {
        name: String,
        path: PathBuf,
        causes: Vec<LoadError>,
    },

    #[error("Package {0} is not registered")]
    Unknown(String),
}

impl RegistryError {
    /// Underlying causes, in the order they were detected.
    pub fn causes(&self) -> Vec<LoadError> {
        match self {
            RegistryError::Duplicate { .. } => {
                vec![LoadError::new(LoadErrorKind::DuplicatePackage, self.to_string())]
            }
            RegistryError::NotFound { .. } => {
                vec![LoadError::new(LoadErrorKind::NotFound, self.to_string())]
            }
            RegistryError::Conflict { .. } => {
                vec![LoadError::new(LoadErrorKind::PathConflict, self.to_string())]
            }
            RegistryError::Malformed { causes, .. } => causes.clone(),
            RegistryError::Unknown(_) => {
                vec![LoadError::new(LoadErrorKind::UnknownPackage, self.to_string())]
            }
        }
    }
}
