//! Command entry points used by the CLI.

mod hook;
mod status;
mod sync;

pub use hook::hook;
pub use status::status;
pub use sync::{SyncOutcome, sync};
