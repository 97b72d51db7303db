//! Configuration: built-in defaults, then the global config file, then the
//! project's `pkgsync.json`. An explicit `--config` file replaces both files.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::report::CausePolicy;
use crate::runtime::{Runtime, resolve_relative_path};
use crate::trigger::BuildCommand;

pub const DEFAULT_INSTALLER: &str = "pkgsync";
pub const DEFAULT_INVENTORY: &str = "vendor/composer/installed.json";
pub const DEFAULT_REGISTRY: &str = ".pkgsync/registry.json";
pub const DEFAULT_MANIFEST: &str = "composer.json";
pub const PROJECT_CONFIG_FILE: &str = "pkgsync.json";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Project root; relative paths and displayed paths are based here.
    pub root: PathBuf,
    pub inventory: PathBuf,
    pub registry: PathBuf,
    /// Ownership tag written on every record this tool creates.
    pub installer: String,
    /// Manifest file name looked up inside each package directory.
    pub manifest: String,
    pub build: Option<BuildCommand>,
    pub cause_policy: CausePolicy,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    inventory: Option<PathBuf>,
    registry: Option<PathBuf>,
    installer: Option<String>,
    manifest: Option<String>,
    build: Option<BuildCommand>,
    all_causes: Option<bool>,
}

impl Config {
    pub fn defaults(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            inventory: root.join(DEFAULT_INVENTORY),
            registry: root.join(DEFAULT_REGISTRY),
            root,
            installer: DEFAULT_INSTALLER.to_string(),
            manifest: DEFAULT_MANIFEST.to_string(),
            build: None,
            cause_policy: CausePolicy::FirstOnly,
        }
    }

    /// Resolve the root and layer the config files over the defaults.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(
        runtime: &R,
        root: Option<PathBuf>,
        explicit: Option<&Path>,
    ) -> Result<Self> {
        let cwd = runtime.current_dir()?;
        let root = resolve_relative_path(&cwd, &root.unwrap_or_else(|| cwd.clone()));
        let mut config = Self::defaults(&root);

        if let Some(path) = explicit {
            let path = resolve_relative_path(&cwd, path);
            let patch = Self::load_patch(runtime, &path)?
                .with_context(|| format!("Config file {:?} does not exist", path))?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = runtime.config_dir()
                && let Some(patch) =
                    Self::load_patch(runtime, &global.join("pkgsync").join("config.json"))?
            {
                config.merge_patch(patch);
            }
            if let Some(patch) = Self::load_patch(runtime, &root.join(PROJECT_CONFIG_FILE))? {
                config.merge_patch(patch);
            }
        }

        if config.installer.trim().is_empty() {
            anyhow::bail!("The installer tag must not be empty");
        }

        Ok(config)
    }

    fn load_patch<R: Runtime>(runtime: &R, path: &Path) -> Result<Option<ConfigPatch>> {
        if !runtime.exists(path) {
            return Ok(None);
        }
        debug!("Loading config from {:?}", path);

        let raw = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let patch = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(inventory) = patch.inventory {
            self.inventory = resolve_relative_path(&self.root, &inventory);
        }
        if let Some(registry) = patch.registry {
            self.registry = resolve_relative_path(&self.root, &registry);
        }
        if let Some(installer) = patch.installer {
            self.installer = installer;
        }
        if let Some(manifest) = patch.manifest {
            self.manifest = manifest;
        }
        if let Some(build) = patch.build {
            self.build = Some(build);
        }
        if let Some(all_causes) = patch.all_causes {
            self.cause_policy = if all_causes {
                CausePolicy::All
            } else {
                CausePolicy::FirstOnly
            };
        }
    }
}
