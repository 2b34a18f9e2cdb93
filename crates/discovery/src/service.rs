use crate::client::SocketClient;
use crate::Result;
use buildspec_protocol::{FileQuery, IndexResponse, QueryResponse, WatchProject};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Budget for a single file query.
pub const INDEX_QUERY_TIMEOUT_NANOS: u64 = 5_000_000_000;

/// Budget for registering a project root with the service.
const WATCH_PROJECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the index service knows a project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchRegistration {
    /// Watched root as the service names it.
    pub watch_root: String,
    /// Sub-scope below the watch root when the project is not the watch root itself.
    pub project_prefix: Option<String>,
}

/// Connection to the index service, scoped to one discovery call.
pub trait IndexQueryClient {
    /// Run one query. `Ok(None)` means the timeout expired.
    fn query_with_timeout(
        &mut self,
        timeout: Duration,
        query: &FileQuery,
    ) -> Result<Option<QueryResponse>>;
}

/// The index service as seen by discovery: whether it can be reached,
/// which roots it watches, and how to open a client.
pub trait IndexService {
    type Client: IndexQueryClient;

    fn transport_path(&self) -> Option<&Path>;

    fn registration_for(&self, root: &Path) -> Option<&WatchRegistration>;

    /// Open a client. Dropping it releases the connection.
    fn connect(&self) -> Result<Self::Client>;

    fn is_available(&self) -> bool {
        self.transport_path().is_some()
    }
}

impl IndexQueryClient for SocketClient {
    fn query_with_timeout(
        &mut self,
        timeout: Duration,
        query: &FileQuery,
    ) -> Result<Option<QueryResponse>> {
        self.request(timeout, query)
    }
}

/// Socket location plus the project roots registered with the service.
#[derive(Debug, Clone, Default)]
pub struct Watchman {
    transport_path: Option<PathBuf>,
    project_watches: HashMap<PathBuf, WatchRegistration>,
}

impl Watchman {
    /// A service that is never available; every recursive spec crawls.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn new(transport_path: impl Into<PathBuf>) -> Self {
        Self {
            transport_path: Some(transport_path.into()),
            project_watches: HashMap::new(),
        }
    }

    pub fn with_registration(mut self, root: impl Into<PathBuf>, watch: WatchRegistration) -> Self {
        self.project_watches.insert(root.into(), watch);
        self
    }

    pub fn project_watches(&self) -> &HashMap<PathBuf, WatchRegistration> {
        &self.project_watches
    }

    /// Ask the service to watch `root` and remember the registration.
    ///
    /// Returns `Ok(false)` when the service is unavailable or did not answer
    /// in time; discovery under `root` will then crawl.
    pub fn watch_project(&mut self, root: &Path) -> Result<bool> {
        let Some(socket) = self.transport_path.clone() else {
            return Ok(false);
        };
        let mut client = match SocketClient::connect(&socket) {
            Ok(client) => client,
            Err(err) => {
                log::debug!(
                    "Index service at {} unreachable ({err}); not watching {}",
                    socket.display(),
                    root.display()
                );
                return Ok(false);
            }
        };

        let command = WatchProject {
            root: root.to_string_lossy().into_owned(),
        };
        let Some(response) = client.request(WATCH_PROJECT_TIMEOUT, &command)? else {
            log::warn!(
                "Timed out after {:?} registering {} with the index service",
                WATCH_PROJECT_TIMEOUT,
                root.display()
            );
            return Ok(false);
        };
        if let Some(error) = response.error() {
            log::warn!("Index service refused to watch {}: {error}", root.display());
            return Ok(false);
        }
        if let Some(warning) = response.warning() {
            log::warn!("Index service warning for {}: {warning}", root.display());
        }
        let Some(watch_root) = response.watch else {
            log::warn!("Index service reply for {} has no watch root", root.display());
            return Ok(false);
        };

        let registration = WatchRegistration {
            watch_root,
            project_prefix: response.relative_path.filter(|p| !p.is_empty()),
        };
        log::debug!(
            "Registered {} (watch root {}, project prefix {:?})",
            root.display(),
            registration.watch_root,
            registration.project_prefix
        );
        self.project_watches.insert(root.to_path_buf(), registration);
        Ok(true)
    }
}

impl IndexService for Watchman {
    type Client = SocketClient;

    fn transport_path(&self) -> Option<&Path> {
        self.transport_path.as_deref()
    }

    fn registration_for(&self, root: &Path) -> Option<&WatchRegistration> {
        self.project_watches.get(root)
    }

    fn connect(&self) -> Result<SocketClient> {
        match &self.transport_path {
            Some(path) => SocketClient::connect(path),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no index service socket configured",
            )
            .into()),
        }
    }
}
