//! Server configuration: built-in defaults layered with an optional
//! config file, via the `config` crate — the same defaults-then-file
//! layering the original Go server gets from `viper`.

use std::path::PathBuf;

use dead_drop_common::error::DeadDropError;
use serde::Deserialize;

fn default_data_dir() -> String {
    "~/dead-drop".to_string()
}

fn default_keys_dir() -> String {
    "~/.dead-drop/keys".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_keys_dir")]
    pub keys_dir: String,
    #[serde(default = "default_ttl_min")]
    pub ttl_min: u64,
    #[serde(default = "default_destructive_read")]
    pub destructive_read: bool,
    pub tls_cert: String,
    pub tls_key: String,
}

fn default_addr() -> String {
    ":4444".to_string()
}

fn default_ttl_min() -> u64 {
    crate::store::DEFAULT_TTL_MIN
}

fn default_destructive_read() -> bool {
    true
}

impl ServerConfig {
    /// Loads defaults, then overlays `config_path` if it exists. `tls-cert`
    /// and `tls-key` carry no default and must come from the file or the
    /// environment; a config without them fails to load.
    pub fn load(config_path: Option<&str>) -> Result<Self, DeadDropError> {
        let mut builder = config::Config::builder()
            .set_default("addr", default_addr())
            .map_err(config_err)?
            .set_default("data_dir", default_data_dir())
            .map_err(config_err)?
            .set_default("keys_dir", default_keys_dir())
            .map_err(config_err)?
            .set_default("ttl_min", default_ttl_min())
            .map_err(config_err)?
            .set_default("destructive_read", default_destructive_read())
            .map_err(config_err)?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("DEAD_DROP").separator("__"),
        );

        let settings = builder.build().map_err(config_err)?;
        settings.try_deserialize().map_err(config_err)
    }

    /// Expands a leading `~` in `data_dir` against the user's home
    /// directory (ports the original server's `go-homedir` usage in
    /// `createDataDir`).
    pub fn data_dir_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    pub fn keys_dir_path(&self) -> PathBuf {
        expand_home(&self.keys_dir)
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(rest),
        None => PathBuf::from(path),
    }
}

fn config_err(e: config::ConfigError) -> DeadDropError {
    DeadDropError::internal(format!("failed to load config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_replaces_tilde_prefix() {
        let expanded = expand_home("~/dead-drop");
        assert!(expanded.ends_with("dead-drop"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn expand_home_leaves_absolute_paths_untouched() {
        let expanded = expand_home("/var/lib/dead-drop");
        assert_eq!(expanded, PathBuf::from("/var/lib/dead-drop"));
    }
}
