use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Load state of a registered package, recomputed every time the registry is opened.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PackageState {
    Enabled,
    NotFound,
    NotLoadable,
}

impl PackageState {
    /// Whether this state should be reported as a load error.
    pub fn is_error(&self) -> bool {
        !matches!(self, PackageState::Enabled)
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PackageState::Enabled => "enabled",
            PackageState::NotFound => "notFound",
            PackageState::NotLoadable => "notLoadable",
        };
        f.write_str(s)
    }
}

/// Short classification of why a package failed to load or register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    NotFound,
    ManifestMissing,
    InvalidManifest,
    NameMismatch,
    DuplicatePackage,
    PathConflict,
    UnknownPackage,
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadErrorKind::NotFound => "NotFound",
            LoadErrorKind::ManifestMissing => "ManifestMissing",
            LoadErrorKind::InvalidManifest => "InvalidManifest",
            LoadErrorKind::NameMismatch => "NameMismatch",
            LoadErrorKind::DuplicatePackage => "DuplicatePackage",
            LoadErrorKind::PathConflict => "PathConflict",
            LoadErrorKind::UnknownPackage => "UnknownPackage",
        };
        f.write_str(s)
    }
}

/// One underlying cause recorded against a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// A package as recorded in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRecord {
    pub name: String,
    pub install_path: PathBuf,
    /// Tag of the subsystem that registered this package. Never rewritten.
    pub installer: String,
    pub state: PackageState,
    pub load_errors: Vec<LoadError>,
}

impl PackageRecord {
    /// A freshly registered, loadable record.
    pub fn new(name: impl Into<String>, install_path: impl Into<PathBuf>, installer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            install_path: install_path.into(),
            installer: installer.into(),
            state: PackageState::Enabled,
            load_errors: Vec::new(),
        }
    }

    /// Attach load errors, deriving the state from the first cause.
    pub fn with_load_errors(mut self, load_errors: Vec<LoadError>) -> Self {
        self.state = match load_errors.first() {
            None => PackageState::Enabled,
            Some(e) if e.kind == LoadErrorKind::NotFound => PackageState::NotFound,
            Some(_) => PackageState::NotLoadable,
        };
        self.load_errors = load_errors;
        self
    }

    pub fn is_owned_by(&self, installer: &str) -> bool {
        self.installer == installer
    }

    pub fn is_at(&self, path: &Path) -> bool {
        self.install_path == path
    }
}
