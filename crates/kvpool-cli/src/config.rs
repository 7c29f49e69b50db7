//! Configuration loading for the `kvpool` binary

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use kvpool_core::{EnvConfig, LayeredConfig, TomlConfig};

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "KVPOOL";

/// Default configuration file, if the platform has a config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kvpool").join("kvpool.toml"))
}

/// Build the layered configuration: environment first, then the TOML file
///
/// An explicitly given file must exist. The default file is optional.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<LayeredConfig> {
    let mut config = LayeredConfig::new().with_layer(EnvConfig::new(ENV_PREFIX));

    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|path| path.is_file()),
    };

    if let Some(path) = path {
        let file = TomlConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        tracing::debug!(path = %path.display(), keys = file.len(), "loaded configuration file");
        config = config.with_layer(file);
    }

    Ok(config)
}
