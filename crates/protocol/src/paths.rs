//! Conversions between local relative paths and the `/`-separated strings
//! used on the wire.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a relative path: drop `.` components and fold `..`
/// into its parent. Returns `None` when the path is absolute or climbs above
/// its starting point.
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => parts.push(name),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts.iter().collect())
}

/// Render a relative path the way the index service expects it. The project
/// root itself is the empty string.
pub fn to_wire_path(relative: &Path) -> String {
    let raw = relative.to_string_lossy().replace('\\', "/");
    let mut value = raw.as_str();
    while let Some(rest) = value.strip_prefix("./") {
        value = rest;
    }
    let value = value.trim_matches('/');
    if value == "." {
        return String::new();
    }
    value.to_string()
}

/// Parse a path returned by the service. Anything that is not a plain
/// relative path (absolute, or escaping through `..`) is rejected.
pub fn from_wire_path(raw: &str) -> Option<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('/') {
        return None;
    }
    let normalized = normalize_relative(Path::new(trimmed))?;
    (!normalized.as_os_str().is_empty()).then_some(normalized)
}
