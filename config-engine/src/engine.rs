use config::Config;

use crate::error::Result;
use crate::providers::ConfigSource;
use crate::settings::MediConnectConfig;
use crate::validation::ConfigValidator;

/// Builds a [`MediConnectConfig`] from compiled-in defaults plus the added
/// sources, later sources overriding earlier ones.
#[derive(Debug, Default)]
pub struct ConfigEngine {
    sources: Vec<ConfigSource>,
    skip_validation: bool,
}

impl ConfigEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Only for tooling that wants to inspect an invalid document
    pub fn without_validation(mut self) -> Self {
        self.skip_validation = true;
        self
    }

    pub fn build(self) -> Result<MediConnectConfig> {
        let defaults = Config::try_from(&MediConnectConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        for source in &self.sources {
            builder = source.apply(builder)?;
        }

        let loaded: MediConnectConfig = builder.build()?.try_deserialize()?;

        if !self.skip_validation {
            ConfigValidator::new().validate(&loaded)?;
        }

        tracing::debug!(
            sources = self.sources.len(),
            nlu_backend = ?loaded.nlu.backend,
            session_store = ?loaded.dialogue.store,
            "Configuration loaded"
        );

        Ok(loaded)
    }
}

/// Defaults, then the optional YAML file, then `MEDICONNECT__*` variables
pub fn load(config_path: Option<&str>) -> Result<MediConnectConfig> {
    let mut engine = ConfigEngine::new();
    if let Some(path) = config_path {
        engine = engine.add_source(ConfigSource::optional_file(path));
    }
    engine.add_source(ConfigSource::env()).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{NluBackendKind, SessionStoreKind};
    use std::io::Write;

    fn write_yaml(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "mediconnect-config-{}-{}.yaml",
            std::process::id(),
            contents.len()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn defaults_are_valid() {
        let config = ConfigEngine::new().build().unwrap();
        assert_eq!(config, MediConnectConfig::default());
        assert_eq!(config.nlu.max_turns, 6);
        assert_eq!(config.languages.fallback, "en-IN");
    }

    #[test]
    fn yaml_overrides_defaults_field_by_field() {
        let path = write_yaml(
            "server:\n  public_base_url: https://voice.example.in\n\
             dialogue:\n  store: redis\n  redis_url: redis://127.0.0.1/\n\
             nlu:\n  backend: openai\n  api_key: sk-test\n",
        );

        let config = ConfigEngine::new()
            .add_source(ConfigSource::file(&path))
            .build()
            .unwrap();

        assert_eq!(config.server.public_base_url, "https://voice.example.in");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.dialogue.store, SessionStoreKind::Redis);
        assert_eq!(config.nlu.backend, NluBackendKind::Openai);
        assert_eq!(config.nlu.model, "gpt-4o-mini");

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn dumped_config_loads_back() {
        let mut written = MediConnectConfig::default();
        written.booking.slot_minutes = 15;
        written.booking.appointment_prefix = "CCH".to_string();
        written.dialogue.max_no_speech_retries = 2;
        let path = write_yaml(&serde_yaml::to_string(&written).unwrap());

        let loaded = ConfigEngine::new()
            .add_source(ConfigSource::file(&path))
            .build()
            .unwrap();

        assert_eq!(loaded.booking.slot_minutes, 15);
        assert_eq!(loaded.booking.appointment_prefix, "CCH");
        assert_eq!(loaded.dialogue.max_no_speech_retries, 2);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_required_file_is_reported() {
        let err = ConfigEngine::new()
            .add_source(ConfigSource::file("/definitely/not/here.yaml"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn invalid_document_fails_validation() {
        let path = write_yaml("nlu:\n  backend: openai\n");
        let err = ConfigEngine::new()
            .add_source(ConfigSource::file(&path))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("api_key"));
        let _ = std::fs::remove_file(path);
    }
}
