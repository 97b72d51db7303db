use log::{debug, info};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::inventory::InventorySnapshot;
use crate::registry::{
    LoadError, PackageRecord, PackageRegistry, PackageState, RegistryError, RegistryExt,
};

use super::{ReconciliationAction, SkipReason};

/// A single package the registry refused to register or remove.
#[derive(Debug)]
pub struct InstallFailure {
    pub name: String,
    pub path: PathBuf,
    pub error: RegistryError,
}

impl InstallFailure {
    fn new(name: &str, path: &Path, error: RegistryError) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            error,
        }
    }

    pub fn causes(&self) -> Vec<LoadError> {
        self.error.causes()
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Every decision, in plan order.
    pub actions: Vec<ReconciliationAction>,
    pub failures: Vec<InstallFailure>,
}

impl ReconcileReport {
    /// Number of actions that touched the registry.
    pub fn mutations(&self) -> usize {
        self.actions.iter().filter(|a| a.is_mutation()).count()
    }

    pub fn is_noop(&self) -> bool {
        self.mutations() == 0
    }
}

/// Diffs the inventory against the registry and applies the result.
///
/// Only records tagged with this reconciler's installer are ever removed or
/// replaced.
pub struct Reconciler {
    installer: String,
}

impl Reconciler {
    pub fn new(installer: impl Into<String>) -> Self {
        Self {
            installer: installer.into(),
        }
    }

    pub fn installer(&self) -> &str {
        &self.installer
    }

    /// Decide what to do without touching the registry.
    pub fn plan<G: PackageRegistry + ?Sized>(
        &self,
        snapshot: &InventorySnapshot,
        registry: &G,
    ) -> Vec<ReconciliationAction> {
        let mut actions = self.plan_removals(snapshot, registry);
        actions.extend(self.plan_additions(snapshot, registry));
        actions
    }

    fn plan_removals<G: PackageRegistry + ?Sized>(
        &self,
        snapshot: &InventorySnapshot,
        registry: &G,
    ) -> Vec<ReconciliationAction> {
        registry
            .find_by(|r| r.is_owned_by(&self.installer) && r.state == PackageState::NotFound)
            .into_iter()
            .map(|record| {
                if snapshot.contains(&record.name) {
                    ReconciliationAction::Skip {
                        name: record.name,
                        reason: SkipReason::Moved,
                    }
                } else {
                    ReconciliationAction::Remove {
                        name: record.name,
                        path: record.install_path,
                    }
                }
            })
            .collect()
    }

    fn plan_additions<G: PackageRegistry + ?Sized>(
        &self,
        snapshot: &InventorySnapshot,
        registry: &G,
    ) -> Vec<ReconciliationAction> {
        snapshot
            .iter()
            .map(|entry| match registry.get(&entry.name) {
                None => ReconciliationAction::Install {
                    name: entry.name.clone(),
                    path: entry.install_path.clone(),
                },
                Some(existing) => self.compare(existing, &entry.install_path),
            })
            .collect()
    }

    fn compare(&self, existing: PackageRecord, path: &Path) -> ReconciliationAction {
        if existing.is_at(path) {
            ReconciliationAction::Skip {
                name: existing.name,
                reason: SkipReason::Unchanged,
            }
        } else if !existing.is_owned_by(&self.installer) {
            ReconciliationAction::Skip {
                name: existing.name,
                reason: SkipReason::ForeignInstaller,
            }
        } else {
            ReconciliationAction::Reinstall {
                name: existing.name,
                old_path: existing.install_path,
                new_path: path.to_path_buf(),
            }
        }
    }

    /// Apply planned actions, isolating failures per package.
    ///
    /// Every removal runs before any install, including the removal half of a
    /// reinstall, so packages that swap directories do not collide with each
    /// other's old records. Installs then follow in plan order.
    pub fn apply<G: PackageRegistry + ?Sized>(
        &self,
        actions: Vec<ReconciliationAction>,
        registry: &mut G,
    ) -> ReconcileReport {
        let mut failures = Vec::new();
        let mut blocked = HashSet::new();

        for action in &actions {
            match action {
                ReconciliationAction::Remove { name, path } => {
                    info!("Removing {} ({})", name, path.display());
                    if let Err(error) = registry.remove(name) {
                        failures.push(InstallFailure::new(name, path, error));
                    }
                }
                ReconciliationAction::Reinstall {
                    name,
                    old_path,
                    new_path,
                } => {
                    info!(
                        "Reinstalling {} ({} -> {})",
                        name,
                        old_path.display(),
                        new_path.display()
                    );
                    if let Err(error) = registry.remove(name) {
                        failures.push(InstallFailure::new(name, old_path, error));
                        blocked.insert(action.name());
                    }
                }
                ReconciliationAction::Skip { name, reason } => {
                    debug!("Skipping {} ({})", name, reason);
                }
                ReconciliationAction::Install { .. } => {}
            }
        }

        for action in &actions {
            let (name, path) = match action {
                ReconciliationAction::Install { name, path } => {
                    info!("Installing {} ({})", name, path.display());
                    (name, path)
                }
                ReconciliationAction::Reinstall { name, new_path, .. }
                    if !blocked.contains(action.name()) =>
                {
                    (name, new_path)
                }
                _ => continue,
            };
            if let Err(error) = registry.install(path, name, &self.installer) {
                failures.push(InstallFailure::new(name, path, error));
            }
        }

        ReconcileReport { actions, failures }
    }

    /// Plan and apply in one go.
    #[tracing::instrument(skip_all, fields(installer = %self.installer))]
    pub fn reconcile<G: PackageRegistry + ?Sized>(
        &self,
        snapshot: &InventorySnapshot,
        registry: &mut G,
    ) -> ReconcileReport {
        let actions = self.plan(snapshot, registry);
        self.apply(actions, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::PackageDescriptor;
    use crate::registry::{LoadErrorKind, MockPackageRegistry};
    use crate::test_utils::MemoryRegistry;
    use mockall::Sequence;
    use mockall::predicate::eq;

    const OWN: &str = "pkgsync";

    fn snapshot(entries: &[(&str, &str)]) -> InventorySnapshot {
        let descriptors: Vec<_> = entries
            .iter()
            .map(|(name, path)| PackageDescriptor::new(*name, *path))
            .collect();
        InventorySnapshot::from_descriptors(&descriptors)
    }

    #[test]
    fn test_install_into_empty_registry() {
        let mut registry = MemoryRegistry::new();
        let snapshot = snapshot(&[("acme/foo", "/vendor/acme/foo")]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(
            report.actions,
            vec![ReconciliationAction::Install {
                name: "acme/foo".into(),
                path: PathBuf::from("/vendor/acme/foo"),
            }]
        );
        assert!(report.failures.is_empty());
        let records = registry.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "acme/foo");
        assert_eq!(records[0].install_path, PathBuf::from("/vendor/acme/foo"));
        assert_eq!(records[0].installer, OWN);
    }

    #[test]
    fn test_reinstall_owned_package_with_new_path() {
        let mut registry =
            MemoryRegistry::with(vec![PackageRecord::new("acme/foo", "/vendor/acme/foo", OWN)]);
        let snapshot = snapshot(&[("acme/foo", "/vendor/acme/foo-renamed")]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(
            report.actions,
            vec![ReconciliationAction::Reinstall {
                name: "acme/foo".into(),
                old_path: PathBuf::from("/vendor/acme/foo"),
                new_path: PathBuf::from("/vendor/acme/foo-renamed"),
            }]
        );
        assert_eq!(registry.log(), vec!["remove acme/foo", "install acme/foo"]);
        let record = registry.get("acme/foo").unwrap();
        assert_eq!(record.install_path, PathBuf::from("/vendor/acme/foo-renamed"));
        assert_eq!(record.installer, OWN);
    }

    #[test]
    fn test_remove_owned_not_found_package() {
        let mut registry = MemoryRegistry::with(vec![
            PackageRecord::new("acme/bar", "/vendor/acme/bar", OWN).with_load_errors(vec![
                LoadError::new(LoadErrorKind::NotFound, "gone"),
            ]),
        ]);
        let snapshot = snapshot(&[]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(
            report.actions,
            vec![ReconciliationAction::Remove {
                name: "acme/bar".into(),
                path: PathBuf::from("/vendor/acme/bar"),
            }]
        );
        assert!(!registry.has("acme/bar"));
    }

    #[test]
    fn test_foreign_package_is_never_replaced() {
        let mut registry =
            MemoryRegistry::with(vec![PackageRecord::new("acme/baz", "/custom/baz", "manual")]);
        let snapshot = snapshot(&[("acme/baz", "/vendor/acme/baz")]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(
            report.actions,
            vec![ReconciliationAction::Skip {
                name: "acme/baz".into(),
                reason: SkipReason::ForeignInstaller,
            }]
        );
        assert!(report.failures.is_empty());
        assert!(registry.log().is_empty());
        assert_eq!(
            registry.get("acme/baz").unwrap().install_path,
            PathBuf::from("/custom/baz")
        );
    }

    #[test]
    fn test_foreign_not_found_package_is_never_removed() {
        let mut registry = MemoryRegistry::with(vec![
            PackageRecord::new("acme/baz", "/custom/baz", "manual").with_load_errors(vec![
                LoadError::new(LoadErrorKind::NotFound, "gone"),
            ]),
        ]);

        let report = Reconciler::new(OWN).reconcile(&snapshot(&[]), &mut registry);

        assert!(report.actions.is_empty());
        assert!(registry.has("acme/baz"));
    }

    #[test]
    fn test_owned_not_found_package_still_in_inventory_is_moved_not_removed() {
        let mut registry = MemoryRegistry::with(vec![
            PackageRecord::new("acme/foo", "/old/foo", OWN).with_load_errors(vec![
                LoadError::new(LoadErrorKind::NotFound, "gone"),
            ]),
        ]);
        let snapshot = snapshot(&[("acme/foo", "/vendor/acme/foo")]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(
            report.actions,
            vec![
                ReconciliationAction::Skip {
                    name: "acme/foo".into(),
                    reason: SkipReason::Moved,
                },
                ReconciliationAction::Reinstall {
                    name: "acme/foo".into(),
                    old_path: PathBuf::from("/old/foo"),
                    new_path: PathBuf::from("/vendor/acme/foo"),
                },
            ]
        );
        assert_eq!(registry.log(), vec!["remove acme/foo", "install acme/foo"]);
    }

    #[test]
    fn test_owned_enabled_package_missing_from_inventory_is_kept() {
        // Only records the registry itself flagged as not found are removed
        let mut registry =
            MemoryRegistry::with(vec![PackageRecord::new("acme/foo", "/vendor/acme/foo", OWN)]);

        let report = Reconciler::new(OWN).reconcile(&snapshot(&[]), &mut registry);

        assert!(report.actions.is_empty());
        assert!(registry.has("acme/foo"));
    }

    #[test]
    fn test_second_run_is_all_skips() {
        let mut registry = MemoryRegistry::with(vec![
            PackageRecord::new("acme/gone", "/vendor/acme/gone", OWN).with_load_errors(vec![
                LoadError::new(LoadErrorKind::NotFound, "gone"),
            ]),
            PackageRecord::new("acme/moved", "/vendor/acme/old", OWN),
        ]);
        let snapshot = snapshot(&[
            ("acme/foo", "/vendor/acme/foo"),
            ("acme/moved", "/vendor/acme/new"),
        ]);
        let reconciler = Reconciler::new(OWN);

        let first = reconciler.reconcile(&snapshot, &mut registry);
        assert_eq!(first.mutations(), 3);

        let log_len = registry.log().len();
        let second = reconciler.reconcile(&snapshot, &mut registry);

        assert!(second.is_noop());
        assert!(
            second
                .actions
                .iter()
                .all(|a| matches!(a, ReconciliationAction::Skip { reason: SkipReason::Unchanged, .. }))
        );
        assert_eq!(registry.log().len(), log_len);
    }

    #[test]
    fn test_failed_install_does_not_stop_the_run() {
        let mut registry = MemoryRegistry::new().failing_on("acme/conflict");
        let snapshot = snapshot(&[
            ("acme/conflict", "/vendor/acme/conflict"),
            ("acme/foo", "/vendor/acme/foo"),
        ]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.name, "acme/conflict");
        assert_eq!(failure.causes()[0].kind, LoadErrorKind::InvalidManifest);
        assert!(registry.has("acme/foo"));
        assert!(!registry.has("acme/conflict"));
    }

    #[test]
    fn test_failed_reinstall_leaves_package_unregistered() {
        let mut registry =
            MemoryRegistry::with(vec![PackageRecord::new("acme/foo", "/old/foo", OWN)])
                .failing_on("acme/foo");
        let snapshot = snapshot(&[("acme/foo", "/vendor/acme/foo")]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, PathBuf::from("/vendor/acme/foo"));
        assert!(!registry.has("acme/foo"));
    }

    #[test]
    fn test_packages_swapping_directories_both_reinstall() {
        let mut registry = MemoryRegistry::with(vec![
            PackageRecord::new("acme/a", "/v/one", OWN),
            PackageRecord::new("acme/b", "/v/two", OWN),
        ]);
        let snapshot = snapshot(&[("acme/a", "/v/two"), ("acme/b", "/v/one")]);

        let report = Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert!(report.failures.is_empty());
        assert_eq!(
            registry.log(),
            vec![
                "remove acme/a",
                "remove acme/b",
                "install acme/a",
                "install acme/b"
            ]
        );
        assert_eq!(registry.get("acme/a").unwrap().install_path, PathBuf::from("/v/two"));
        assert_eq!(registry.get("acme/b").unwrap().install_path, PathBuf::from("/v/one"));
    }

    #[test]
    fn test_failed_reinstall_removal_skips_its_install() {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_records()
            .returning(|| vec![PackageRecord::new("acme/foo", "/old/foo", OWN)]);
        registry
            .expect_get()
            .returning(|name| Some(PackageRecord::new(name, "/old/foo", OWN)));
        registry
            .expect_remove()
            .returning(|name| Err(RegistryError::Unknown(name.to_string())));
        registry.expect_install().never();

        let report =
            Reconciler::new(OWN).reconcile(&snapshot(&[("acme/foo", "/new/foo")]), &mut registry);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, PathBuf::from("/old/foo"));
    }

    #[test]
    fn test_additions_follow_snapshot_order() {
        let mut registry = MemoryRegistry::new();
        let snapshot = snapshot(&[
            ("acme/c", "/v/c"),
            ("acme/a", "/v/a"),
            ("acme/b", "/v/b"),
        ]);

        Reconciler::new(OWN).reconcile(&snapshot, &mut registry);

        assert_eq!(
            registry.log(),
            vec!["install acme/c", "install acme/a", "install acme/b"]
        );
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let registry =
            MemoryRegistry::with(vec![PackageRecord::new("acme/foo", "/old/foo", OWN)]);
        let snapshot = snapshot(&[("acme/foo", "/new/foo"), ("acme/bar", "/new/bar")]);

        let plan = Reconciler::new(OWN).plan(&snapshot, &registry);

        assert_eq!(plan.len(), 2);
        assert!(registry.log().is_empty());
        assert_eq!(
            registry.get("acme/foo").unwrap().install_path,
            PathBuf::from("/old/foo")
        );
    }

    #[test]
    fn test_removals_are_applied_before_installs() {
        let mut registry = MockPackageRegistry::new();
        let mut seq = Sequence::new();

        registry.expect_records().returning(|| {
            vec![
                PackageRecord::new("acme/old", "/v/old", OWN).with_load_errors(vec![
                    LoadError::new(LoadErrorKind::NotFound, "gone"),
                ]),
            ]
        });
        registry
            .expect_get()
            .with(eq("acme/new"))
            .returning(|_| None);

        registry
            .expect_remove()
            .with(eq("acme/old"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        registry
            .expect_install()
            .withf(|path, name, installer| {
                path == Path::new("/v/new") && name == "acme/new" && installer == OWN
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));

        let report = Reconciler::new(OWN).reconcile(&snapshot(&[("acme/new", "/v/new")]), &mut registry);

        assert_eq!(report.mutations(), 2);
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_failed_remove_is_reported() {
        let mut registry = MockPackageRegistry::new();
        registry.expect_records().returning(|| {
            vec![
                PackageRecord::new("acme/old", "/v/old", OWN).with_load_errors(vec![
                    LoadError::new(LoadErrorKind::NotFound, "gone"),
                ]),
            ]
        });
        registry
            .expect_remove()
            .returning(|name| Err(RegistryError::Unknown(name.to_string())));

        let report = Reconciler::new(OWN).reconcile(&snapshot(&[]), &mut registry);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].causes()[0].kind, LoadErrorKind::UnknownPackage);
    }
}
