use anyhow::Result;
use log::debug;

use crate::config::Config;
use crate::registry::{JsonRegistry, PackageRegistry};
use crate::report::{LoadErrorReporter, LoadWarning};
use crate::runtime::{Runtime, display_relative};

/// Print every registered package and warn about the ones that fail to load.
#[tracing::instrument(skip(runtime, config))]
pub fn status<R: Runtime>(runtime: &R, config: &Config) -> Result<Vec<LoadWarning>> {
    let registry = JsonRegistry::open(runtime, &config.registry, &config.manifest)?;
    let records = registry.records();
    debug!("Registry {:?} has {} record(s)", registry.path(), records.len());

    if records.is_empty() {
        println!("No packages registered.");
        return Ok(Vec::new());
    }

    for record in &records {
        println!(
            "{} {} {} {}",
            record.name,
            record.state,
            record.installer,
            display_relative(&config.root, &record.install_path)
        );
    }

    let reporter = LoadErrorReporter::new(&config.root, config.cause_policy);
    Ok(reporter.report(&registry))
}
