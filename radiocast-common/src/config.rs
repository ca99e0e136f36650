//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "RADIOCAST_ROOT_FOLDER";

/// Logging section shared by all TOML files
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. `root_folder` key of the TOML config file
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, env_var_name: &str) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(config_path) = default_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    default_root_folder()
}

/// Platform config file location, if one exists
///
/// Linux checks `~/.config/radiocast/config.toml` then
/// `/etc/radiocast/config.toml`; other platforms only the user config dir.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("radiocast").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/radiocast/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("radiocast"))
        .unwrap_or_else(|| PathBuf::from("./radiocast_data"))
}

/// Load a TOML config file, falling back to defaults when it is absent
///
/// A missing file is not an error (warning + defaults). A file that exists
/// but does not parse is.
pub fn load_toml<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No config file given, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        warn!("Config file {} not found, using built-in defaults", path.display());
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Create the root folder if needed
pub fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::Config(format!(
                "Root folder is not a directory: {}",
                path.display()
            )));
        }
        return Ok(());
    }
    std::fs::create_dir_all(path)?;
    info!("Created root folder {}", path.display());
    Ok(())
}
