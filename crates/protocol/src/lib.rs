//! Wire types for the file index service.
//!
//! The service speaks newline-delimited JSON over a local socket. Every
//! request is a JSON array whose first element names the command; every
//! response is a JSON object that may carry an `error` or `warning` field
//! next to the command-specific payload.

use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod paths;
pub mod query;
pub mod watch;

pub use query::{FileQuery, QueryParams, QueryResponse};
pub use watch::{WatchProject, WatchProjectResponse};

/// Environment variable the index service exports with its socket path.
pub const SOCKET_ENV: &str = "WATCHMAN_SOCK";

/// A request the index service understands, paired with its response shape.
pub trait IndexCommand: Serialize {
    type Response: DeserializeOwned + IndexResponse;

    /// Command name as sent on the wire (`"query"`, `"watch-project"`).
    fn name(&self) -> &'static str;
}

/// Fields shared by every response object.
pub trait IndexResponse {
    fn error(&self) -> Option<&str>;
    fn warning(&self) -> Option<&str>;

    /// Unsolicited subscription pushes are flagged `unilateral` and are not
    /// replies to the pending request.
    fn is_unilateral(&self) -> bool;
}

/// Render a request for log and error messages.
pub fn render_command<C: IndexCommand>(command: &C) -> String {
    serde_json::to_string(command).unwrap_or_else(|_| format!("[\"{}\", ...]", command.name()))
}
