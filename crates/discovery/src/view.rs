use crate::{DiscoveryError, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read-only projection of a project root.
///
/// Relative paths are interpreted against [`PathView::root`]. Views hold no
/// mutable state and are shared freely between concurrent discoveries.
pub trait PathView {
    /// Absolute project root.
    fn root(&self) -> &Path;

    /// Join `relative` onto the root. Does not touch the filesystem.
    fn resolve(&self, relative: &Path) -> PathBuf {
        self.root().join(relative)
    }

    /// Strip the root from an absolute path; `None` when it lies outside.
    fn relativize(&self, absolute: &Path) -> Option<PathBuf> {
        absolute
            .strip_prefix(self.root())
            .ok()
            .map(Path::to_path_buf)
    }

    /// `true` when `path` is the root or lies below it.
    fn is_subdir_of(&self, path: &Path) -> bool {
        path.starts_with(self.root())
    }

    fn is_directory(&self, relative: &Path) -> bool;

    /// Project-level ignore rules applied to index results.
    fn is_ignored(&self, relative: &Path) -> bool;

    /// Lazily walk every regular file below `base`, yielding paths relative
    /// to the root.
    fn walk_files<'a>(
        &'a self,
        base: &Path,
        follow_symlinks: bool,
    ) -> Box<dyn Iterator<Item = Result<PathBuf>> + 'a>;
}

/// [`PathView`] over the real filesystem with gitignore-style ignore rules.
#[derive(Debug, Clone)]
pub struct FsPathView {
    root: PathBuf,
    ignore: Gitignore,
}

impl FsPathView {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_ignore(root, &[])
    }

    /// Build a view whose ignore predicate matches `patterns` (gitignore
    /// syntax, anchored at the root).
    pub fn with_ignore(root: impl AsRef<Path>, patterns: &[String]) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            return Err(DiscoveryError::Config(format!(
                "project root {} is not absolute",
                root.display()
            )));
        }

        let mut builder = GitignoreBuilder::new(&root);
        for pattern in patterns {
            builder
                .add_line(None, pattern)
                .map_err(|err| DiscoveryError::Config(format!("ignore '{pattern}': {err}")))?;
        }
        let ignore = builder
            .build()
            .map_err(|err| DiscoveryError::Config(err.to_string()))?;

        Ok(Self { root, ignore })
    }
}

impl PathView for FsPathView {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_directory(&self, relative: &Path) -> bool {
        self.resolve(relative).is_dir()
    }

    fn is_ignored(&self, relative: &Path) -> bool {
        let relative = relative.strip_prefix(&self.root).unwrap_or(relative);
        if relative.is_absolute() {
            return false;
        }
        self.ignore
            .matched_path_or_any_parents(relative, false)
            .is_ignore()
    }

    fn walk_files<'a>(
        &'a self,
        base: &Path,
        follow_symlinks: bool,
    ) -> Box<dyn Iterator<Item = Result<PathBuf>> + 'a> {
        let walker = WalkDir::new(self.resolve(base))
            .follow_links(follow_symlinks)
            .into_iter();

        Box::new(walker.filter_map(move |entry| match entry {
            Ok(entry) if entry.file_type().is_file() => {
                let relative = entry
                    .path()
                    .strip_prefix(&self.root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| entry.path().to_path_buf());
                Some(Ok(relative))
            }
            Ok(_) => None,
            Err(err) if is_dangling_link(&err) => None,
            Err(err) => Some(Err(DiscoveryError::from(err))),
        }))
    }
}

/// A link whose target is gone. Loops and permission errors do not qualify.
fn is_dangling_link(err: &walkdir::Error) -> bool {
    let target_missing = err
        .io_error()
        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound);
    match err.path() {
        Some(path) if target_missing => {
            let is_link = path
                .symlink_metadata()
                .is_ok_and(|meta| meta.file_type().is_symlink());
            if is_link {
                log::debug!("Skipping dangling symlink {}", path.display());
            }
            is_link
        }
        _ => false,
    }
}
