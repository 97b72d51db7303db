//! Human-readable warnings for packages that failed to load or register.

use log::warn;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::reconcile::InstallFailure;
use crate::registry::{LoadError, PackageRecord, PackageRegistry, RegistryExt};
use crate::runtime::{display_relative, strip_root};

/// How many recorded causes to show per package.
///
/// Records always keep every cause; this only affects display.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CausePolicy {
    #[default]
    FirstOnly,
    All,
}

impl CausePolicy {
    pub fn select<'e>(&self, causes: &'e [LoadError]) -> &'e [LoadError] {
        match self {
            CausePolicy::FirstOnly => &causes[..causes.len().min(1)],
            CausePolicy::All => causes,
        }
    }
}

/// A rendered warning: name, root-relative path and the selected causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub name: String,
    pub path: String,
    /// `(short kind, message)` pairs with the root prefix stripped.
    pub causes: Vec<(String, String)>,
    headline: &'static str,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package {} ({}) {}", self.name, self.path, self.headline)?;
        if self.causes.is_empty() {
            return Ok(());
        }
        let rendered: Vec<String> = self
            .causes
            .iter()
            .map(|(kind, message)| format!("{}: {}", kind, message))
            .collect();
        write!(f, ": {}", rendered.join("; "))
    }
}

pub struct LoadErrorReporter {
    root: PathBuf,
    policy: CausePolicy,
}

impl LoadErrorReporter {
    pub fn new(root: impl Into<PathBuf>, policy: CausePolicy) -> Self {
        Self {
            root: root.into(),
            policy,
        }
    }

    fn warning(
        &self,
        name: &str,
        path: &Path,
        causes: &[LoadError],
        headline: &'static str,
    ) -> LoadWarning {
        LoadWarning {
            name: name.to_string(),
            path: display_relative(&self.root, path),
            causes: self
                .policy
                .select(causes)
                .iter()
                .map(|c| (c.kind.to_string(), strip_root(&c.message, &self.root)))
                .collect(),
            headline,
        }
    }

    pub fn load_warning(&self, record: &PackageRecord) -> LoadWarning {
        self.warning(
            &record.name,
            &record.install_path,
            &record.load_errors,
            "could not be loaded",
        )
    }

    pub fn failure_warning(&self, failure: &InstallFailure) -> LoadWarning {
        self.warning(
            &failure.name,
            &failure.path,
            &failure.causes(),
            "could not be registered",
        )
    }

    /// Warnings for every record in `notFound` or `notLoadable` state.
    pub fn collect<G: PackageRegistry + ?Sized>(&self, registry: &G) -> Vec<LoadWarning> {
        registry
            .find_by(|r| r.state.is_error())
            .iter()
            .map(|r| self.load_warning(r))
            .collect()
    }

    /// Log one warning per failing record. Returns what was logged.
    pub fn report<G: PackageRegistry + ?Sized>(&self, registry: &G) -> Vec<LoadWarning> {
        let warnings = self.collect(registry);
        for warning in &warnings {
            warn!("{}", warning);
        }
        warnings
    }

    /// Log one warning per package the reconciler could not register.
    pub fn report_failures(&self, failures: &[InstallFailure]) -> Vec<LoadWarning> {
        let warnings: Vec<_> = failures.iter().map(|f| self.failure_warning(f)).collect();
        for warning in &warnings {
            warn!("{}", warning);
        }
        warnings
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::registry::{LoadErrorKind, RegistryError};
    use crate::test_utils::MemoryRegistry;

    fn broken_record() -> PackageRecord {
        PackageRecord::new("acme/broken", "/app/vendor/acme/broken", "pkgsync").with_load_errors(
            vec![
                LoadError::new(
                    LoadErrorKind::NameMismatch,
                    "Manifest /app/vendor/acme/broken/composer.json declares acme/other, expected acme/broken",
                ),
                LoadError::new(LoadErrorKind::InvalidManifest, "second cause"),
            ],
        )
    }

    #[test]
    fn test_first_cause_only_by_default() {
        let reporter = LoadErrorReporter::new("/app", CausePolicy::default());
        let warning = reporter.load_warning(&broken_record());

        assert_eq!(warning.path, "vendor/acme/broken");
        assert_eq!(warning.causes.len(), 1);
        assert_eq!(
            warning.to_string(),
            "Package acme/broken (vendor/acme/broken) could not be loaded: NameMismatch: \
             Manifest vendor/acme/broken/composer.json declares acme/other, expected acme/broken"
        );
    }

    #[test]
    fn test_all_causes_policy() {
        let reporter = LoadErrorReporter::new("/app", CausePolicy::All);
        let warning = reporter.load_warning(&broken_record());

        assert_eq!(warning.causes.len(), 2);
        assert!(warning.to_string().ends_with("; InvalidManifest: second cause"));
    }

    #[test]
    fn test_record_without_causes() {
        let reporter = LoadErrorReporter::new("/app", CausePolicy::FirstOnly);
        let mut record = PackageRecord::new("acme/x", "/elsewhere/x", "pkgsync");
        record.state = crate::registry::PackageState::NotLoadable;

        assert_eq!(
            reporter.load_warning(&record).to_string(),
            "Package acme/x (/elsewhere/x) could not be loaded"
        );
    }

    #[test]
    fn test_collect_only_failing_records() {
        let registry = MemoryRegistry::with(vec![
            PackageRecord::new("acme/ok", "/app/vendor/acme/ok", "pkgsync"),
            broken_record(),
            PackageRecord::new("acme/gone", "/app/vendor/acme/gone", "manual").with_load_errors(
                vec![LoadError::new(
                    LoadErrorKind::NotFound,
                    "Package directory /app/vendor/acme/gone does not exist",
                )],
            ),
        ]);
        let reporter = LoadErrorReporter::new("/app", CausePolicy::FirstOnly);

        let warnings = reporter.report(&registry);

        let names: Vec<_> = warnings.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["acme/broken", "acme/gone"]);
        assert_eq!(
            warnings[1].causes[0],
            (
                "NotFound".to_string(),
                "Package directory vendor/acme/gone does not exist".to_string()
            )
        );
    }

    #[test]
    fn test_failure_warning_names_package_and_first_cause() {
        let reporter = LoadErrorReporter::new("/app", CausePolicy::FirstOnly);
        let failures = vec![InstallFailure {
            name: "acme/conflict".into(),
            path: PathBuf::from("/app/vendor/acme/conflict"),
            error: RegistryError::Conflict {
                name: "acme/conflict".into(),
                other: "acme/foo".into(),
                path: PathBuf::from("/app/vendor/acme/conflict"),
            },
        }];

        let warnings = reporter.report_failures(&failures);

        assert_eq!(warnings.len(), 1);
        let text = warnings[0].to_string();
        assert!(text.starts_with("Package acme/conflict (vendor/acme/conflict) could not be registered"));
        assert!(text.contains("PathConflict: Package acme/conflict conflicts with acme/foo"));
    }

    #[test]
    fn test_cause_policy_select_empty() {
        assert!(CausePolicy::FirstOnly.select(&[]).is_empty());
        assert!(CausePolicy::All.select(&[]).is_empty());
    }
}
