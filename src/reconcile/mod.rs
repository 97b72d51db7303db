//! Reconciliation of the registry against the installed inventory.
//!
//! Removals are planned from the registry side, additions and reinstalls from
//! the inventory side. Removals are always applied first.

mod action;
mod reconciler;

pub use action::{ReconciliationAction, SkipReason};
pub use reconciler::{InstallFailure, ReconcileReport, Reconciler};
