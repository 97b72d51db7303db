use anyhow::Result;
use log::{debug, info};

use crate::config::Config;
use crate::inventory::{InstalledJsonSource, InventorySnapshot};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::registry::JsonRegistry;
use crate::report::{LoadErrorReporter, LoadWarning};
use crate::runtime::Runtime;
use crate::trigger::{BuildOutcome, BuildTrigger};

/// Everything a sync run produced.
#[derive(Debug)]
pub struct SyncOutcome {
    pub report: ReconcileReport,
    /// Install failures followed by registry load errors, in logged order.
    pub warnings: Vec<LoadWarning>,
    pub build: BuildOutcome,
}

/// Synchronize the registry with the installed inventory, then start the build.
///
/// The build step runs even when reconciliation fails. The reconciliation
/// error is returned afterwards.
#[tracing::instrument(skip(runtime, config))]
pub fn sync<R: Runtime>(runtime: &R, config: &Config, dry_run: bool) -> Result<SyncOutcome> {
    if dry_run {
        return plan_only(runtime, config);
    }

    let result = reconcile_registry(runtime, config);

    let build = BuildTrigger::new(runtime, config.build.clone(), &config.root).launch();
    debug!("Build step {}", build);

    let (report, warnings) = result?;
    Ok(SyncOutcome {
        report,
        warnings,
        build,
    })
}

fn reconcile_registry<R: Runtime>(
    runtime: &R,
    config: &Config,
) -> Result<(ReconcileReport, Vec<LoadWarning>)> {
    let source = InstalledJsonSource::new(runtime, &config.inventory);
    let snapshot = InventorySnapshot::capture(&source)?;
    debug!("Inventory lists {} package(s)", snapshot.len());

    let mut registry = JsonRegistry::open(runtime, &config.registry, &config.manifest)?;
    let reconciler = Reconciler::new(&config.installer);
    let reporter = LoadErrorReporter::new(&config.root, config.cause_policy);

    let report = reconciler.reconcile(&snapshot, &mut registry);
    let mut warnings = reporter.report_failures(&report.failures);

    registry.save()?;

    if report.is_noop() {
        info!("Package registry is up to date");
    }

    warnings.extend(reporter.report(&registry));
    Ok((report, warnings))
}

fn plan_only<R: Runtime>(runtime: &R, config: &Config) -> Result<SyncOutcome> {
    let source = InstalledJsonSource::new(runtime, &config.inventory);
    let snapshot = InventorySnapshot::capture(&source)?;
    let registry = JsonRegistry::open(runtime, &config.registry, &config.manifest)?;

    let actions = Reconciler::new(&config.installer).plan(&snapshot, &registry);
    for action in actions.iter().filter(|a| a.is_mutation()) {
        println!("{}", action);
    }
    if actions.iter().all(|a| !a.is_mutation()) {
        println!("Nothing to do.");
    }

    Ok(SyncOutcome {
        report: ReconcileReport {
            actions,
            failures: Vec::new(),
        },
        warnings: Vec::new(),
        build: BuildOutcome::Skipped("dry run".into()),
    })
}
