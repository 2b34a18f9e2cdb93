//! In-memory doubles for the view and the index service.

use crate::service::{IndexQueryClient, IndexService, WatchRegistration};
use crate::view::PathView;
use crate::Result;
use buildspec_protocol::{FileQuery, QueryResponse};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// View over a fixed file list that counts walks.
pub(crate) struct RecordingView {
    root: PathBuf,
    files: Vec<PathBuf>,
    ignored_names: Vec<String>,
    walks: AtomicUsize,
}

impl RecordingView {
    pub(crate) fn new(root: &str, files: &[&str]) -> Self {
        Self {
            root: PathBuf::from(root),
            files: files.iter().map(PathBuf::from).collect(),
            ignored_names: Vec::new(),
            walks: AtomicUsize::new(0),
        }
    }

    /// Treat any path with a component named `name` as ignored.
    pub(crate) fn ignoring(mut self, name: &str) -> Self {
        self.ignored_names.push(name.to_string());
        self
    }

    pub(crate) fn walks(&self) -> usize {
        self.walks.load(Ordering::SeqCst)
    }
}

impl PathView for RecordingView {
    fn root(&self) -> &Path {
        &self.root
    }

    fn is_directory(&self, relative: &Path) -> bool {
        relative.as_os_str().is_empty()
            || self
                .files
                .iter()
                .any(|file| file.starts_with(relative) && file != relative)
    }

    fn is_ignored(&self, relative: &Path) -> bool {
        relative.components().any(|component| {
            self.ignored_names
                .iter()
                .any(|name| component.as_os_str() == name.as_str())
        })
    }

    fn walk_files<'a>(
        &'a self,
        base: &Path,
        _follow_symlinks: bool,
    ) -> Box<dyn Iterator<Item = Result<PathBuf>> + 'a> {
        self.walks.fetch_add(1, Ordering::SeqCst);
        let base = base.to_path_buf();
        Box::new(
            self.files
                .iter()
                .filter(move |file| file.starts_with(&base))
                .cloned()
                .map(Ok),
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) enum ScriptedReply {
    Files(Vec<&'static str>),
    Error(&'static str),
    Response(QueryResponse),
    Timeout,
}

impl ScriptedReply {
    fn to_response(&self) -> Option<QueryResponse> {
        match self {
            Self::Files(files) => Some(QueryResponse {
                files: Some(files.iter().map(|f| f.to_string()).collect()),
                ..Default::default()
            }),
            Self::Error(error) => Some(QueryResponse {
                error: Some(error.to_string()),
                ..Default::default()
            }),
            Self::Response(response) => Some(response.clone()),
            Self::Timeout => None,
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    queries: AtomicUsize,
    released: AtomicUsize,
}

pub(crate) struct FakeService {
    socket: Option<PathBuf>,
    registration: Option<(PathBuf, WatchRegistration)>,
    reply: ScriptedReply,
    refuse: bool,
    counters: Arc<Counters>,
}

impl FakeService {
    pub(crate) fn unavailable() -> Self {
        Self {
            socket: None,
            registration: None,
            reply: ScriptedReply::Timeout,
            refuse: false,
            counters: Arc::default(),
        }
    }

    /// Reachable, but no root registered.
    pub(crate) fn available(reply: ScriptedReply) -> Self {
        Self {
            socket: Some(PathBuf::from("/fake/index.sock")),
            reply,
            ..Self::unavailable()
        }
    }

    pub(crate) fn registered(root: &str, reply: ScriptedReply) -> Self {
        Self {
            registration: Some((
                PathBuf::from(root),
                WatchRegistration {
                    watch_root: root.to_string(),
                    project_prefix: None,
                },
            )),
            ..Self::available(reply)
        }
    }

    /// Fail every connection attempt.
    pub(crate) fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub(crate) fn connections(&self) -> usize {
        self.counters.connections.load(Ordering::SeqCst)
    }

    pub(crate) fn queries(&self) -> usize {
        self.counters.queries.load(Ordering::SeqCst)
    }

    pub(crate) fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }
}

impl IndexService for FakeService {
    type Client = FakeClient;

    fn transport_path(&self) -> Option<&Path> {
        self.socket.as_deref()
    }

    fn registration_for(&self, root: &Path) -> Option<&WatchRegistration> {
        self.registration
            .as_ref()
            .filter(|(registered, _)| registered == root)
            .map(|(_, registration)| registration)
    }

    fn connect(&self) -> Result<FakeClient> {
        if self.refuse {
            return Err(std::io::Error::from(std::io::ErrorKind::ConnectionRefused).into());
        }
        self.counters.connections.fetch_add(1, Ordering::SeqCst);
        Ok(FakeClient {
            reply: self.reply.clone(),
            counters: Some(self.counters.clone()),
            last_query: None,
        })
    }
}

pub(crate) struct FakeClient {
    reply: ScriptedReply,
    counters: Option<Arc<Counters>>,
    last_query: Option<FileQuery>,
}

impl FakeClient {
    pub(crate) fn new(reply: ScriptedReply) -> Self {
        Self {
            reply,
            counters: None,
            last_query: None,
        }
    }

    pub(crate) fn last_query(&self) -> Option<&FileQuery> {
        self.last_query.as_ref()
    }
}

impl IndexQueryClient for FakeClient {
    fn query_with_timeout(
        &mut self,
        _timeout: Duration,
        query: &FileQuery,
    ) -> Result<Option<QueryResponse>> {
        if let Some(counters) = &self.counters {
            counters.queries.fetch_add(1, Ordering::SeqCst);
        }
        self.last_query = Some(query.clone());
        Ok(self.reply.to_response())
    }
}

impl Drop for FakeClient {
    fn drop(&mut self) {
        if let Some(counters) = &self.counters {
            counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }
}
