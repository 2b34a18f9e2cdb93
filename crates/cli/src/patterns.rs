use anyhow::Result;
use buildspec_discovery::{BuildFileSpec, BuildTarget};
use std::path::Path;

/// Turn a command line pattern into a spec.
///
/// * `dir/...` searches `dir` recursively (`...` alone is the whole root);
/// * `//dir:name` and `cell//dir:name` name the build file of one target;
/// * anything else is the build file of a single directory.
pub fn parse_pattern(raw: &str, root: &Path) -> Result<BuildFileSpec> {
    let raw = raw.trim();
    if raw.contains("//") {
        let target = BuildTarget::parse(raw, root)?;
        return Ok(BuildFileSpec::from_build_target(&target)?);
    }

    if raw == "..." {
        return Ok(BuildFileSpec::from_recursive_path("", root)?);
    }
    if let Some(base) = raw.strip_suffix("/...") {
        return Ok(BuildFileSpec::from_recursive_path(base, root)?);
    }

    Ok(BuildFileSpec::from_path(raw, root)?)
}
