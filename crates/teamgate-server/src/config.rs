//! Server configuration.
//!
//! Values come from an optional `teamgate.toml` (or any format the `config`
//! crate recognises) overlaid by `TEAMGATE__`-prefixed environment
//! variables, e.g. `TEAMGATE__DB__URL=db.internal:8000`.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use teamgate_access::AccessConfig;
use teamgate_db::DbConfig;

const CONFIG_FILE: &str = "teamgate";
const ENV_PREFIX: &str = "TEAMGATE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub access: AccessConfig,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Emit JSON log lines instead of the human-readable format.
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            access: AccessConfig::default(),
            log_filter: "teamgate=info".into(),
            log_json: true,
        }
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder().add_source(File::with_name(CONFIG_FILE).required(false)),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()
    }
}
