//! Best-effort external build step run after reconciliation.

use log::{debug, info, warn};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Program and arguments of the build step.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// What happened to the build step. Never folded into reconciliation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Launched { pid: u32 },
    Skipped(String),
    Failed(String),
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Launched { pid } => write!(f, "launched (pid {})", pid),
            BuildOutcome::Skipped(reason) => write!(f, "skipped: {}", reason),
            BuildOutcome::Failed(message) => write!(f, "failed: {}", message),
        }
    }
}

pub struct BuildTrigger<'a, R: Runtime> {
    runtime: &'a R,
    command: Option<BuildCommand>,
    cwd: PathBuf,
}

impl<'a, R: Runtime> BuildTrigger<'a, R> {
    pub fn new(runtime: &'a R, command: Option<BuildCommand>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            command,
            cwd: cwd.into(),
        }
    }

    /// Find the executable, either by explicit path or on `PATH`.
    ///
    /// `PATH` candidates must be executable (and honor `PATHEXT` on Windows).
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let candidate = Path::new(program);
        if candidate.components().count() > 1 || candidate.is_absolute() {
            let path = if candidate.is_absolute() {
                candidate.to_path_buf()
            } else {
                self.cwd.join(candidate)
            };
            return self.runtime.is_file(&path).then_some(path);
        }

        let search_path = self.runtime.env_var("PATH").ok()?;
        which::which_in(program, Some(search_path), &self.cwd).ok()
    }

    pub fn is_supported(&self) -> bool {
        self.command
            .as_ref()
            .is_some_and(|c| self.runtime.can_spawn() && self.locate(&c.program).is_some())
    }

    /// Launch the build step without waiting for it.
    #[tracing::instrument(skip(self))]
    pub fn launch(&self) -> BuildOutcome {
        let Some(command) = &self.command else {
            debug!("No build command configured");
            return BuildOutcome::Skipped("no build command configured".into());
        };

        if !self.runtime.can_spawn() {
            debug!("Process launching is not supported on this platform");
            return BuildOutcome::Skipped("process launching unsupported".into());
        }

        let Some(program) = self.locate(&command.program) else {
            debug!("Build program {} not found", command.program);
            return BuildOutcome::Skipped(format!("{} not found", command.program));
        };

        match self.runtime.spawn(&program, &command.args, &self.cwd) {
            Ok(pid) => {
                info!("Started build: {} {}", program.display(), command.args.join(" "));
                BuildOutcome::Launched { pid }
            }
            Err(e) => {
                warn!("Failed to start build {}: {:#}", program.display(), e);
                BuildOutcome::Failed(format!("{:#}", e))
            }
        }
    }
}
