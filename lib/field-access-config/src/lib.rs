mod env_overrides;
pub mod log;
pub mod schema;

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat, FileSourceFile};
use envconfig::Envconfig;
use hive_field_access::AllowedFields;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

use crate::{
    env_overrides::{EnvVarOverrides, EnvVarOverridesError},
    log::LoggingConfig,
    schema::{SchemaLoadError, SchemaSource},
};

#[derive(Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldAccessConfig {
    #[serde(skip)]
    root_directory: PathBuf,

    /// The logger configuration.
    #[serde(default)]
    pub log: LoggingConfig,

    /// Source of the schema SDL. By default, `./schema.graphql` is used.
    #[serde(default)]
    #[schemars(extend("type" = "object"))]
    pub schema: SchemaSource,

    /// Fields that may be fetched per restricted type.
    ///
    /// A type maps to `"*"`, a single field name, or a list of field names and
    /// nested `{ field: rule }` objects. Types that are not listed are not restricted.
    #[serde(default)]
    #[schemars(schema_with = "allowed_fields_schema")]
    pub allowed_fields: AllowedFields,
}

impl FieldAccessConfig {
    /// Directory used to resolve relative paths of the configuration.
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    pub fn load_schema(&self) -> Result<String, SchemaLoadError> {
        self.schema.load(&self.root_directory)
    }
}

fn allowed_fields_schema(_generator: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "additionalProperties": {
            "anyOf": [
                { "type": "string" },
                {
                    "type": "array",
                    "items": {
                        "anyOf": [
                            { "type": "string" },
                            { "type": "object" }
                        ]
                    }
                }
            ]
        }
    })
}

#[derive(Debug, thiserror::Error)]
pub enum FieldAccessConfigError {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(#[from] config::ConfigError),
    #[error("Failed to apply configuration overrides: {0}")]
    EnvVarOverridesError(#[from] EnvVarOverridesError),
    #[error("Failed to load the environment variables: {0}")]
    EnvVarLoadError(#[from] envconfig::Error),
    #[error("Failed to get the current directory: {0}")]
    CurrentDirError(std::io::Error),
    #[error("Failed to parse the configuration file path: {0}")]
    ConfigPathParseError(Infallible),
}

static DEFAULT_FILE_NAMES: &[&str] = &[
    "field-access.config.yaml",
    "field-access.config.yml",
    "field-access.config.json",
    "field-access.config.json5",
];

fn get_current_dir() -> Result<PathBuf, FieldAccessConfigError> {
    std::env::current_dir().map_err(FieldAccessConfigError::CurrentDirError)
}

/// Loads the configuration from `override_config_path`, or from the first
/// default file found in the working directory, then applies the
/// environment overrides.
pub fn load_config(
    override_config_path: Option<String>,
) -> Result<FieldAccessConfig, FieldAccessConfigError> {
    let env_overrides = EnvVarOverrides::init_from_env()?;
    let mut config = Config::builder();
    let mut config_root_path = get_current_dir()?;

    if let Some(path_str) = override_config_path {
        let path_buf = path_str
            .parse::<PathBuf>()
            .map_err(FieldAccessConfigError::ConfigPathParseError)?;
        if let Some(parent_dir) = path_buf.parent() {
            config_root_path = config_root_path.join(parent_dir);
        }
        let as_file: File<FileSourceFile, _> = path_buf.into();

        config = config.add_source(as_file.required(true));
    } else {
        for name in DEFAULT_FILE_NAMES {
            config = config.add_source(File::with_name(name).required(false));
        }
    }

    config = env_overrides.apply_overrides(config)?;

    let mut base_cfg = config.build()?.try_deserialize::<FieldAccessConfig>()?;
    base_cfg.root_directory = config_root_path;

    Ok(base_cfg)
}

pub fn parse_yaml_config(config_raw: String) -> Result<FieldAccessConfig, FieldAccessConfigError> {
    let mut base_cfg = Config::builder()
        .add_source(File::from_str(&config_raw, FileFormat::Yaml))
        .build()?
        .try_deserialize::<FieldAccessConfig>()?;
    base_cfg.root_directory = get_current_dir()?;

    Ok(base_cfg)
}
