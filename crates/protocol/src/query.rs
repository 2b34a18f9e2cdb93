use crate::{IndexCommand, IndexResponse};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Value};

/// `["query", <watch root>, <params>]` restricted to name lookups of plain files.
#[derive(Debug, Clone, PartialEq)]
pub struct FileQuery {
    pub watch_root: String,
    pub params: QueryParams,
}

/// Query parameters. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_root: Option<String>,
    pub sync_timeout: u64,
    pub path: Vec<String>,
    pub fields: Vec<String>,
    pub expression: Value,
}

impl FileQuery {
    /// Find every plain file named `file_name` under `relative_base`.
    ///
    /// `sync_timeout` is zero: the service answers from its current in-memory
    /// view instead of waiting for pending filesystem events to settle.
    /// Symlinks are excluded by the `type` term.
    pub fn named_files(
        watch_root: impl Into<String>,
        project_prefix: Option<String>,
        relative_base: impl Into<String>,
        file_name: &str,
    ) -> Self {
        Self {
            watch_root: watch_root.into(),
            params: QueryParams {
                relative_root: project_prefix,
                sync_timeout: 0,
                path: vec![relative_base.into()],
                fields: vec!["name".to_string()],
                expression: json!(["allof", "exists", ["name", file_name], ["type", "f"]]),
            },
        }
    }
}

impl Serialize for FileQuery {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(3)?;
        tuple.serialize_element(self.name())?;
        tuple.serialize_element(&self.watch_root)?;
        tuple.serialize_element(&self.params)?;
        tuple.end()
    }
}

impl IndexCommand for FileQuery {
    type Response = QueryResponse;

    fn name(&self) -> &'static str {
        "query"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    /// Present on success; paths relative to `relative_root` (or the watch root).
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub unilateral: bool,
}

impl IndexResponse for QueryResponse {
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
