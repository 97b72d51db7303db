//! Path utility functions for normalization and root-relative display.

use std::path::{Component, Path, PathBuf};

/// Normalize a path by processing `.` and `..` components lexically.
/// This does not access the filesystem and does not follow symlinks.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Keep the `..` when there is nothing left to pop
                if !result.pop() {
                    result.push(component);
                }
            }
            _ => result.push(component),
        }
    }
    result
}

/// Resolve a path against a base directory.
///
/// Absolute paths are returned normalized; relative ones are joined onto
/// `base_dir` first. `vendor/composer` + `../acme/foo` gives `vendor/acme/foo`.
pub fn resolve_relative_path(base_dir: &Path, relative_path: &Path) -> PathBuf {
    if relative_path.is_absolute() {
        normalize_path(relative_path)
    } else {
        normalize_path(&base_dir.join(relative_path))
    }
}

/// Render `path` relative to `root` for messages.
///
/// Paths outside of `root` (or on another drive) are shown as-is.
pub fn display_relative(root: &Path, path: &Path) -> String {
    let normalized = normalize_path(path);
    let root = normalize_path(root);

    if !normalized.starts_with(&root) {
        return normalized.display().to_string();
    }

    match pathdiff::diff_paths(&normalized, &root) {
        Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Some(rel) if !rel.is_absolute() => rel.display().to_string(),
        _ => normalized.display().to_string(),
    }
}

/// Strip every occurrence of the `root/` directory prefix from a message.
pub fn strip_root(message: &str, root: &Path) -> String {
    let root = normalize_path(root);
    let root_str = root.display().to_string();
    if root_str.is_empty() || root_str == "/" {
        return message.to_string();
    }

    let with_sep = format!("{}{}", root_str, std::path::MAIN_SEPARATOR);
    message.replace(&with_sep, "")
}
