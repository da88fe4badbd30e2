use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// ATProto handle of the account the records are written to.
    handle: String,
    /// App password for that account (not the main account password).
    app_password: String,
    #[serde(default)]
    soundcloud: Option<SoundCloudConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoundCloudConfig {
    pub client_id: String,
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("tunes-mirror").join("config.toml"))
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path().ok_or(eyre!("Config file not found"))?;

        Self::from_file(&config_path)
    }

    /// Create a template config file at the default location, if it doesn't exist
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or(eyre!("No default config path found"))?;
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }
        let template = "\
# tunes-mirror configuration
handle = \"\"
app_password = \"\"

# Optional: needed for SoundCloud playlists
# [soundcloud]
# client_id = \"\"
";
        std::fs::write(&path, template)
            .context(format!("Failed to write config file: {}", path.display()))?;
        Ok(path)
    }

    /// Account credentials, validated to be non-empty.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        if self.handle.trim().is_empty() || self.app_password.trim().is_empty() {
            return Err(eyre!(
                "Enter `handle` and `app_password` in the config file first"
            ));
        }
        Ok((self.handle.trim(), self.app_password.as_str()))
    }

    pub fn soundcloud_client_id(&self) -> Option<&str> {
        self.soundcloud.as_ref().map(|sc| sc.client_id.as_str())
    }
}
