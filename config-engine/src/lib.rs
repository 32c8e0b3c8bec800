//! Layered configuration for the MediConnect booking engine
//!
//! Configuration is resolved in three layers, each overriding the previous:
//!
//! 1. compiled-in defaults ([`MediConnectConfig::default`])
//! 2. an optional YAML file (`--config mediconnect.yaml`)
//! 3. environment variables, `MEDICONNECT__<SECTION>__<KEY>`
//!
//! The result is validated once at startup by [`ConfigValidator`]; components
//! receive their own section by value and never read the environment.
//!
//! # Example
//!
//! ```rust,no_run
//! use config_engine::{ConfigEngine, ConfigSource};
//!
//! # fn main() -> Result<(), config_engine::ConfigError> {
//! let config = ConfigEngine::new()
//!     .add_source(ConfigSource::optional_file("mediconnect.yaml"))
//!     .add_source(ConfigSource::env())
//!     .build()?;
//!
//! println!("callbacks go to {}", config.server.public_base_url);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```yaml
//! server:
//!   public_base_url: https://voice.citycare.in
//! nlu:
//!   backend: openai
//!   model: gpt-4o-mini
//!   max_turns: 6
//! dialogue:
//!   store: redis
//!   redis_url: redis://cache:6379/
//! booking:
//!   clinic_utc_offset_minutes: 330
//! ```

pub mod engine;
pub mod error;
pub mod providers;
pub mod settings;
pub mod validation;

pub use engine::*;
pub use error::*;
pub use providers::*;
pub use settings::*;
pub use validation::ConfigValidator;
