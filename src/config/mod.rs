// Configuration management module
// Handles the TOML configuration file and default locations

pub mod settings;

#[cfg(test)]
mod tests;

pub use settings::{Config, ConfigError, ElasticsearchConfig, OllamaConfig, WatcherConfig};

/// Get the default configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("docshelf"))
        .ok_or(ConfigError::DirectoryError)
}
