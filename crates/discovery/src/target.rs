use crate::{DiscoveryError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// A fully-qualified build target, `[cell]//base/path:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildTarget {
    cell_name: Option<String>,
    cell_path: PathBuf,
    base_path: PathBuf,
    short_name: String,
}

impl BuildTarget {
    /// Parse `raw` against the absolute root of the cell it belongs to.
    ///
    /// `//a/b` is shorthand for `//a/b:b`.
    pub fn parse(raw: &str, cell_path: &Path) -> Result<Self> {
        let raw = raw.trim();
        let Some((cell, rest)) = raw.split_once("//") else {
            return Err(DiscoveryError::invalid_target(format!(
                "'{raw}' must start with // or <cell>//"
            )));
        };
        if !cell_path.is_absolute() {
            return Err(DiscoveryError::invalid_target(format!(
                "cell path {} is not absolute",
                cell_path.display()
            )));
        }

        let (base, name) = match rest.split_once(':') {
            Some((base, name)) => (base, name.to_string()),
            None => {
                let last = rest.rsplit('/').next().unwrap_or_default();
                (rest, last.to_string())
            }
        };
        if name.is_empty() || name.contains(['/', ':']) {
            return Err(DiscoveryError::invalid_target(format!(
                "'{raw}' has no valid target name"
            )));
        }
        if base.starts_with('/') || base.ends_with('/') {
            return Err(DiscoveryError::invalid_target(format!(
                "'{raw}' has a malformed base path"
            )));
        }
        if base.split('/').any(|part| part == "." || part == "..") {
            return Err(DiscoveryError::invalid_target(format!(
                "'{raw}' base path must not contain . or .."
            )));
        }

        Ok(Self {
            cell_name: (!cell.is_empty()).then(|| cell.to_string()),
            cell_path: cell_path.to_path_buf(),
            base_path: PathBuf::from(base),
            short_name: name,
        })
    }

    pub fn cell_name(&self) -> Option<&str> {
        self.cell_name.as_deref()
    }

    /// Absolute root of the owning cell.
    pub fn cell_path(&self) -> &Path {
        &self.cell_path
    }

    /// Directory declaring the target, relative to the cell root.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}//{}:{}",
            self.cell_name.as_deref().unwrap_or_default(),
            self.base_path.to_string_lossy().replace('\\', "/"),
            self.short_name
        )
    }
}
