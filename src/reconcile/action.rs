use std::fmt;
use std::path::PathBuf;

/// Why a package was left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Already registered at the inventory path.
    Unchanged,
    /// Registered by someone else; never replaced.
    ForeignInstaller,
    /// Missing from disk but still in the inventory; the addition pass re-paths it.
    Moved,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::Unchanged => "unchanged",
            SkipReason::ForeignInstaller => "foreign installer",
            SkipReason::Moved => "moved",
        };
        f.write_str(s)
    }
}

/// One decided registry mutation (or non-mutation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationAction {
    Install {
        name: String,
        path: PathBuf,
    },
    Reinstall {
        name: String,
        old_path: PathBuf,
        new_path: PathBuf,
    },
    Remove {
        name: String,
        path: PathBuf,
    },
    Skip {
        name: String,
        reason: SkipReason,
    },
}

impl ReconciliationAction {
    pub fn name(&self) -> &str {
        match self {
            ReconciliationAction::Install { name, .. }
            | ReconciliationAction::Reinstall { name, .. }
            | ReconciliationAction::Remove { name, .. }
            | ReconciliationAction::Skip { name, .. } => name,
        }
    }

    /// Whether applying this action changes the registry.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, ReconciliationAction::Skip { .. })
    }
}

impl fmt::Display for ReconciliationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationAction::Install { name, path } => {
                write!(f, "install {} ({})", name, path.display())
            }
            ReconciliationAction::Reinstall {
                name,
                old_path,
                new_path,
            } => write!(
                f,
                "reinstall {} ({} -> {})",
                name,
                old_path.display(),
                new_path.display()
            ),
            ReconciliationAction::Remove { name, path } => {
                write!(f, "remove {} ({})", name, path.display())
            }
            ReconciliationAction::Skip { name, reason } => write!(f, "skip {} ({})", name, reason),
        }
    }
}
