use std::path::Path;

use crate::runtime::Runtime;

use super::{LoadError, LoadErrorKind};

/// Check that `dir` holds a loadable package named `name`.
///
/// Returns every cause found, in order. An empty list means the package is
/// loadable. A missing directory or manifest stops the checks early.
#[tracing::instrument(skip(runtime))]
pub fn inspect_package_dir<R: Runtime + ?Sized>(
    runtime: &R,
    name: &str,
    dir: &Path,
    manifest: &str,
) -> Vec<LoadError> {
    if !runtime.is_dir(dir) {
        return vec![LoadError::new(
            LoadErrorKind::NotFound,
            format!("Package directory {} does not exist", dir.display()),
        )];
    }

    let manifest_path = dir.join(manifest);
    if !runtime.is_file(&manifest_path) {
        return vec![LoadError::new(
            LoadErrorKind::ManifestMissing,
            format!("Manifest {} not found", manifest_path.display()),
        )];
    }

    let content = match runtime.read_to_string(&manifest_path) {
        Ok(content) => content,
        Err(e) => {
            return vec![LoadError::new(
                LoadErrorKind::InvalidManifest,
                format!("Failed to read manifest {}: {}", manifest_path.display(), e),
            )];
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            return vec![LoadError::new(
                LoadErrorKind::InvalidManifest,
                format!("Manifest {} is not valid JSON: {}", manifest_path.display(), e),
            )];
        }
    };

    let Some(object) = value.as_object() else {
        return vec![LoadError::new(
            LoadErrorKind::InvalidManifest,
            format!("Manifest {} is not a JSON object", manifest_path.display()),
        )];
    };

    let mut errors = Vec::new();

    match object.get("name").and_then(|n| n.as_str()) {
        None => errors.push(LoadError::new(
            LoadErrorKind::InvalidManifest,
            format!(
                "Manifest {} does not declare a package name",
                manifest_path.display()
            ),
        )),
        Some(declared) if declared != name => errors.push(LoadError::new(
            LoadErrorKind::NameMismatch,
            format!(
                "Manifest {} declares {}, expected {}",
                manifest_path.display(),
                declared,
                name
            ),
        )),
        Some(_) => {}
    }

    if let Some(kind) = object.get("type")
        && !kind.is_string()
    {
        errors.push(LoadError::new(
            LoadErrorKind::InvalidManifest,
            format!(
                "Manifest {} has a non-string \"type\" field",
                manifest_path.display()
            ),
        ));
    }

    errors
}
