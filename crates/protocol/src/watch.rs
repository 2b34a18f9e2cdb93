use crate::{IndexCommand, IndexResponse};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};

/// `["watch-project", <absolute root>]`: ask the service to watch the
/// enclosing watch root of a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchProject {
    pub root: String,
}

impl Serialize for WatchProject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.name())?;
        tuple.serialize_element(&self.root)?;
        tuple.end()
    }
}

impl IndexCommand for WatchProject {
    type Response = WatchProjectResponse;

    fn name(&self) -> &'static str {
        "watch-project"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchProjectResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub watch: Option<String>,
    /// Set when the project lives below the watch root.
    #[serde(default)]
    pub relative_path: Option<String>,
    #[serde(default)]
    pub unilateral: bool,
}

impl IndexResponse for WatchProjectResponse {
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    fn is_unilateral(&self) -> bool {
        self.unilateral
    }
}
