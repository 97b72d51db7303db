use anyhow::Result;
use log::info;

use crate::config::Config;
use crate::latch::{LifecycleEvent, RunLatch};
use crate::runtime::Runtime;

use super::sync::{SyncOutcome, sync};

/// Handle lifecycle notifications. At most one sync runs per latch.
///
/// Returns the outcome of the sync, or `None` when every event arrived after
/// the latch had already fired.
#[tracing::instrument(skip(runtime, config, latch))]
pub fn hook<R: Runtime>(
    runtime: &R,
    config: &Config,
    latch: &RunLatch,
    events: &[LifecycleEvent],
) -> Result<Option<SyncOutcome>> {
    let mut outcome = None;

    for event in events {
        if !latch.try_acquire() {
            info!("Registry already synchronized, ignoring {} event", event);
            continue;
        }
        info!("Synchronizing package registry after {}", event);
        outcome = Some(sync(runtime, config, false)?);
    }

    Ok(outcome)
}
