//! # Build File Discovery
//!
//! Turns a build file spec (base path, recursive flag, cell root) into the
//! build files it designates.
//!
//! ## Strategies
//!
//! ```text
//! BuildFileSpec
//!     │
//!     ├──> non-recursive: <cell>/<base>/<build file name>
//!     │
//!     └──> recursive
//!            ├─> index service query (root registered, answers within 5s)
//!            │      └─> files minus ignored paths
//!            │
//!            └─> filesystem crawl (no service, unregistered root, timeout)
//!                   └─> every file with the build file name
//! ```
//!
//! An error reported by the index service fails the discovery; it never
//! falls back to the crawl.
//!
//! ## Example
//!
//! ```no_run
//! use buildspec_discovery::{BuildFileFinder, BuildFileSpec, DiscoveryConfig};
//! use std::path::Path;
//!
//! fn main() -> buildspec_discovery::Result<()> {
//!     let root = Path::new("/repo");
//!     let finder = BuildFileFinder::open(root, DiscoveryConfig::load(root)?)?;
//!     let spec = BuildFileSpec::from_recursive_path("services", root)?;
//!     for path in finder.find(&spec)? {
//!         println!("{}", path.display());
//!     }
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod finder;
mod service;
mod spec;
mod target;
#[cfg(test)]
mod test_support;
mod view;

pub use client::SocketClient;
pub use config::{DiscoveryConfig, SearchMethod, CONFIG_FILE_NAME, DEFAULT_BUILD_FILE_NAME};
pub use error::{DiscoveryError, Result};
pub use finder::{find_build_files, BuildFileFinder};
pub use service::{
    IndexQueryClient, IndexService, WatchRegistration, Watchman, INDEX_QUERY_TIMEOUT_NANOS,
};
pub use spec::BuildFileSpec;
pub use target::BuildTarget;
pub use view::{FsPathView, PathView};
