//! Exactly-once guard for lifecycle notifications.
//!
//! The dependency manager may deliver the same install/update notification
//! twice. Only the first delivery per process runs a reconciliation.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lifecycle notifications that trigger a reconciliation.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    PostInstall,
    PostUpdate,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::PostInstall => f.write_str("post-install"),
            LifecycleEvent::PostUpdate => f.write_str("post-update"),
        }
    }
}

/// One-shot flag, only ever reset by starting a new process.
#[derive(Debug, Default)]
pub struct RunLatch {
    fired: AtomicBool,
}

impl RunLatch {
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Returns `true` for the first caller only.
    pub fn try_acquire(&self) -> bool {
        !self.fired.swap(true, Ordering::SeqCst)
    }
}

/// Process-wide latch for the sync hook.
pub static SYNC_LATCH: RunLatch = RunLatch::new();
