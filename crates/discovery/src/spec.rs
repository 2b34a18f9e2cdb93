use crate::config::SearchMethod;
use crate::service::{
    IndexQueryClient, IndexService, WatchRegistration, INDEX_QUERY_TIMEOUT_NANOS,
};
use crate::target::BuildTarget;
use crate::view::PathView;
use crate::{DiscoveryError, Result};
use buildspec_protocol::paths::{from_wire_path, normalize_relative, to_wire_path};
use buildspec_protocol::{render_command, FileQuery};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Which build files a parser should look at: one directory, or a whole
/// subtree, inside a given cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildFileSpec {
    // Relative to `cell_path`, normalized.
    base_path: PathBuf,
    recursive: bool,
    cell_path: PathBuf,
}

impl BuildFileSpec {
    /// `base_path` may be relative to `cell_path` or absolute; either way it
    /// must stay inside the cell.
    pub fn new(
        base_path: impl AsRef<Path>,
        recursive: bool,
        cell_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let base_path = base_path.as_ref();
        let cell_path = cell_path.as_ref();
        if !cell_path.is_absolute() {
            return Err(DiscoveryError::invalid_spec(format!(
                "cell path {} is not absolute",
                cell_path.display()
            )));
        }

        let relative = if base_path.is_absolute() {
            base_path.strip_prefix(cell_path).map_err(|_| {
                DiscoveryError::invalid_spec(format!(
                    "{} is outside of {}",
                    base_path.display(),
                    cell_path.display()
                ))
            })?
        } else {
            base_path
        };
        let base_path = normalize_relative(relative).ok_or_else(|| {
            DiscoveryError::invalid_spec(format!(
                "{} escapes {}",
                base_path.display(),
                cell_path.display()
            ))
        })?;

        Ok(Self {
            base_path,
            recursive,
            cell_path: cell_path.to_path_buf(),
        })
    }

    pub fn from_recursive_path(
        base_path: impl AsRef<Path>,
        cell_path: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::new(base_path, true, cell_path)
    }

    pub fn from_path(base_path: impl AsRef<Path>, cell_path: impl AsRef<Path>) -> Result<Self> {
        Self::new(base_path, false, cell_path)
    }

    /// The single build file declaring `target`.
    pub fn from_build_target(target: &BuildTarget) -> Result<Self> {
        Self::from_path(target.base_path(), target.cell_path())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn cell_path(&self) -> &Path {
        &self.cell_path
    }

    /// Pass every build file this spec matches to `sink`.
    ///
    /// Non-recursive specs yield exactly one path without checking that it
    /// exists. Recursive specs are answered either by the index service or
    /// by a crawl of `base_path`, never by both.
    pub fn for_each_build_file<V, S, F>(
        &self,
        view: &V,
        build_file_name: &str,
        search_method: SearchMethod,
        service: &S,
        mut sink: F,
    ) -> Result<()>
    where
        V: PathView + ?Sized,
        S: IndexService,
        F: FnMut(PathBuf),
    {
        if !self.recursive {
            sink(view.resolve(&self.base_path.join(build_file_name)));
            return Ok(());
        }

        log::debug!(
            "Finding build files for {} under {}...",
            self.base_path.display(),
            view.root().display()
        );
        let started = Instant::now();

        let registration = service.registration_for(view.root());
        let try_index = search_method == SearchMethod::Watchman
            && service.is_available()
            && registration.is_some();

        let mut walk_complete = false;
        match registration {
            Some(registration) if try_index => {
                log::debug!(
                    "Searching for {build_file_name} files (watch root {}, project prefix {:?}, \
                     base path {}) with the index service",
                    registration.watch_root,
                    registration.project_prefix,
                    self.base_path.display()
                );
                match service.connect() {
                    Ok(mut client) => {
                        walk_complete = for_each_build_file_index(
                            view,
                            &mut client,
                            registration,
                            &self.base_path,
                            build_file_name,
                            &mut sink,
                        )?;
                    }
                    Err(DiscoveryError::Interrupted) => return Err(DiscoveryError::Interrupted),
                    Err(err) => log::debug!("Index service unreachable: {err}"),
                }
            }
            _ => log::debug!(
                "Not using the index service (search method {search_method}, \
                 socket present {}, root registered {})",
                service.is_available(),
                registration.is_some()
            ),
        }

        if !walk_complete {
            log::debug!(
                "Searching for {build_file_name} files under {} using a filesystem crawl (slow)",
                view.root().display()
            );
            self.for_each_build_file_filesystem(view, build_file_name, &mut sink)?;
        }

        log::debug!("Completed search in {} ms.", started.elapsed().as_millis());
        Ok(())
    }

    fn for_each_build_file_filesystem<V, F>(
        &self,
        view: &V,
        build_file_name: &str,
        sink: &mut F,
    ) -> Result<()>
    where
        V: PathView + ?Sized,
        F: FnMut(PathBuf),
    {
        if !view.is_directory(&self.base_path) {
            return Err(DiscoveryError::DirectoryNotFound(self.base_path.clone()));
        }

        // Ignore rules are not consulted here, unlike the index path.
        for file in view.walk_files(&self.base_path, true) {
            let file = file?;
            if file.file_name().is_some_and(|name| name == build_file_name) {
                sink(view.resolve(&file));
            }
        }
        Ok(())
    }
}

/// Answer a recursive spec from the index service.
///
/// Returns `Ok(false)` when the query timed out and the caller must crawl.
pub(crate) fn for_each_build_file_index<V, C, F>(
    view: &V,
    client: &mut C,
    registration: &WatchRegistration,
    base_path: &Path,
    build_file_name: &str,
    sink: &mut F,
) -> Result<bool>
where
    V: PathView + ?Sized,
    C: IndexQueryClient,
    F: FnMut(PathBuf),
{
    let relative_base = if base_path.is_absolute() {
        if !view.is_subdir_of(base_path) {
            return Err(DiscoveryError::invalid_spec(format!(
                "{} is not under {}",
                base_path.display(),
                view.root().display()
            )));
        }
        view.relativize(base_path).unwrap_or_default()
    } else {
        base_path.to_path_buf()
    };

    let query = FileQuery::named_files(
        registration.watch_root.clone(),
        registration.project_prefix.clone(),
        to_wire_path(&relative_base),
        build_file_name,
    );

    let timeout = Duration::from_nanos(INDEX_QUERY_TIMEOUT_NANOS);
    let Some(response) = client.query_with_timeout(timeout, &query)? else {
        log::warn!(
            "Timed out after {INDEX_QUERY_TIMEOUT_NANOS} ns for index query {}",
            render_command(&query)
        );
        return Ok(false);
    };

    if let Some(error) = response.error {
        return Err(DiscoveryError::IndexQuery {
            query: render_command(&query),
            error,
        });
    }
    if let Some(warning) = &response.warning {
        log::warn!("Index warning from query {}: {warning}", render_command(&query));
    }

    let Some(files) = response.files else {
        return Err(DiscoveryError::MalformedResponse(format!(
            "no files in reply to {}",
            render_command(&query)
        )));
    };
    log::trace!("Query {} -> files {files:?}", render_command(&query));

    for raw in &files {
        let Some(relative) = from_wire_path(raw) else {
            log::warn!("Skipping unexpected path {raw:?} from the index service");
            continue;
        };
        if view.is_ignored(&relative) {
            continue;
        }
        // The index already confirmed a plain file, so join instead of
        // stat-ing through the filesystem.
        sink(view.resolve(&relative));
    }

    Ok(true)
}
