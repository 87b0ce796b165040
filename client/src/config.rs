//! Client-side config file support: `--remote`, `--private-key`, and
//! `--key-name` can each come from the CLI flags or from a config file
//! (default `~/.dead-drop/conf.toml`), with the flag taking precedence.

use std::path::PathBuf;

use dead_drop_common::error::DeadDropError;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    pub remote: Option<String>,
    pub private_key: Option<String>,
    pub key_name: Option<String>,
}

impl ClientConfig {
    /// Loads `path` if given, else the default `~/.dead-drop/conf.toml`
    /// if it exists, else an empty config (CLI flags must then supply
    /// everything required for the requested subcommand).
    pub fn load(path: Option<&str>) -> Result<Self, DeadDropError> {
        let path = match path {
            Some(p) => Some(PathBuf::from(p)),
            None => default_config_path(),
        };

        let Some(path) = path.filter(|p| p.exists()) else {
            return Ok(ClientConfig::default());
        };

        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .map_err(config_err)?;
        settings.try_deserialize().map_err(config_err)
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".dead-drop").join("conf.toml"))
}

fn config_err(e: config::ConfigError) -> DeadDropError {
    DeadDropError::internal(format!("failed to load client config: {e}"))
}
