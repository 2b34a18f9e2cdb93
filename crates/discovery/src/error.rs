use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The crawl was asked to search a directory that does not exist.
    #[error(
        "The folder {} could not be found.\n\
         Please check that you spelled the name of the build target correctly.",
        .0.display()
    )]
    DirectoryNotFound(PathBuf),

    /// The index service answered with an explicit error.
    #[error("Error from index query {query}: {error}")]
    IndexQuery { query: String, error: String },

    #[error("Malformed index response: {0}")]
    MalformedResponse(String),

    #[error("Invalid build file spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid build target: {0}")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Interrupted while waiting on a blocking call")]
    Interrupted,

    #[error("IO error: {0}")]
    IoError(io::Error),

    #[error("Walk error: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DiscoveryError {
    pub fn invalid_spec(msg: impl Into<String>) -> Self {
        Self::InvalidSpec(msg.into())
    }

    pub fn invalid_target(msg: impl Into<String>) -> Self {
        Self::InvalidTarget(msg.into())
    }

    /// Errors caused by user input rather than by the system. Callers print
    /// these without a backtrace or internal context.
    pub fn is_human_readable(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound(_) | Self::InvalidSpec(_) | Self::InvalidTarget(_)
        )
    }
}

impl From<io::Error> for DiscoveryError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::IoError(err)
        }
    }
}
