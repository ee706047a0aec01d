use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Failed to read schema file '{path}': {source}")]
pub struct SchemaLoadError {
    pub path: String,
    #[source]
    pub source: std::io::Error,
}

/// Where the schema SDL, used to resolve the return types of root fields, comes from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(tag = "source")]
pub enum SchemaSource {
    /// Loads the schema from the filesystem.
    /// Relative paths are resolved against the directory of the configuration file.
    #[serde(rename = "file")]
    File { path: String },
}

impl Default for SchemaSource {
    fn default() -> Self {
        SchemaSource::File {
            path: "schema.graphql".into(),
        }
    }
}

impl SchemaSource {
    pub fn load(&self, root_directory: &Path) -> Result<String, SchemaLoadError> {
        match self {
            SchemaSource::File { path } => {
                let absolute = root_directory.join(path);
                std::fs::read_to_string(&absolute).map_err(|source| SchemaLoadError {
                    path: absolute.to_string_lossy().into_owned(),
                    source,
                })
            }
        }
    }
}
