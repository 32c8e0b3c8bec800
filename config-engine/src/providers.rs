// Configuration sources, applied in the order they are added
use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};

use crate::error::{ConfigError, Result};

pub const ENV_PREFIX: &str = "MEDICONNECT";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// YAML file; missing file is an error only when `required`
    File { path: PathBuf, required: bool },
    /// `MEDICONNECT__SECTION__KEY` variables
    Environment { prefix: String },
}

impl ConfigSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    pub fn optional_file(path: impl AsRef<Path>) -> Self {
        ConfigSource::File {
            path: path.as_ref().to_path_buf(),
            required: false,
        }
    }

    pub fn env() -> Self {
        ConfigSource::Environment {
            prefix: ENV_PREFIX.to_string(),
        }
    }

    pub(crate) fn apply(
        &self,
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        match self {
            ConfigSource::File { path, required } => {
                if *required && !path.exists() {
                    return Err(ConfigError::SourceNotFound(path.display().to_string()));
                }
                Ok(builder.add_source(
                    File::from(path.as_path())
                        .format(FileFormat::Yaml)
                        .required(*required),
                ))
            }
            ConfigSource::Environment { prefix } => Ok(builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("languages.supported"),
            )),
        }
    }
}
