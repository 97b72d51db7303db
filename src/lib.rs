pub mod commands;
pub mod config;
pub mod inventory;
pub mod latch;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod runtime;
pub mod trigger;
