use crate::config::{DiscoveryConfig, SearchMethod};
use crate::service::{IndexService, Watchman};
use crate::spec::BuildFileSpec;
use crate::view::{FsPathView, PathView};
use crate::{DiscoveryError, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Paths of the build files `spec` matches, deduplicated.
pub fn find_build_files<V, S>(
    spec: &BuildFileSpec,
    view: &V,
    build_file_name: &str,
    service: &S,
    search_method: SearchMethod,
) -> Result<HashSet<PathBuf>>
where
    V: PathView + ?Sized,
    S: IndexService,
{
    let mut build_files = HashSet::new();
    spec.for_each_build_file(view, build_file_name, search_method, service, |path| {
        build_files.insert(path);
    })?;
    Ok(build_files)
}

/// A view, an index service and the settings that go with them.
pub struct BuildFileFinder<V, S> {
    view: V,
    service: S,
    config: DiscoveryConfig,
}

impl<V: PathView, S: IndexService> BuildFileFinder<V, S> {
    pub fn new(view: V, service: S, config: DiscoveryConfig) -> Self {
        Self {
            view,
            service,
            config,
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn find(&self, spec: &BuildFileSpec) -> Result<HashSet<PathBuf>> {
        find_build_files(
            spec,
            &self.view,
            &self.config.build_file_name,
            &self.service,
            self.config.search_method,
        )
    }

    /// Union of the matches of every spec. Stops at the first failure.
    pub fn find_all(&self, specs: &[BuildFileSpec]) -> Result<HashSet<PathBuf>> {
        let mut build_files = HashSet::new();
        for spec in specs {
            spec.for_each_build_file(
                &self.view,
                &self.config.build_file_name,
                self.config.search_method,
                &self.service,
                |path| {
                    build_files.insert(path);
                },
            )?;
        }
        Ok(build_files)
    }
}

impl BuildFileFinder<FsPathView, Watchman> {
    /// Filesystem view of `root` plus the configured index service, with
    /// `root` registered when the service answers.
    pub fn open(root: &Path, config: DiscoveryConfig) -> Result<Self> {
        config.validate()?;
        let view = FsPathView::with_ignore(root, &config.ignore)?;

        let mut service = match (&config.watchman_socket, config.search_method) {
            (Some(socket), SearchMethod::Watchman) => Watchman::new(socket),
            _ => Watchman::unavailable(),
        };
        if service.is_available() {
            match service.watch_project(root) {
                Ok(_) => {}
                Err(DiscoveryError::Interrupted) => return Err(DiscoveryError::Interrupted),
                Err(err) => log::warn!(
                    "Could not register {} with the index service: {err}",
                    root.display()
                ),
            }
        }

        Ok(Self::new(view, service, config))
    }
}
