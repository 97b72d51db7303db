//! Detached process launching.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::{Command, Stdio};

use super::RealRuntime;

impl RealRuntime {
    pub(crate) fn can_spawn_impl(&self) -> bool {
        cfg!(any(unix, windows))
    }

    #[tracing::instrument(skip(self))]
    pub(crate) fn spawn_impl(&self, program: &Path, args: &[String], cwd: &Path) -> Result<u32> {
        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to launch {}", program.display()))?;

        // Dropping the handle leaves the child running; nobody waits for it.
        Ok(child.id())
    }
}
