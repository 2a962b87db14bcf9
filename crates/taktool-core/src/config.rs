use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaktoolError};

const CONFIG_FILE: &str = "taktool.toml";

pub const DEFAULT_OUTPUT: &str = "product.infz";
pub const DEFAULT_IMAGES_DIR: &str = "images";
pub const DEFAULT_PLATFORM: &str = "Android";

/// Default config template with rich comments
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# taktool configuration file
# Location: <working directory>/taktool.toml

[bundle]
# Rename plugins to their preferred names and remove older revisions
# of the same plugin before packaging.
# Default: true
rename = true

# Name of the bundle archive written into the working directory
# Default: "product.infz"
output = "product.infz"

# Directory holding custom PNG icons that replace the embedded ones
# Default: "images"
images_dir = "images"

# Platform column written into product.inf
# Default: "Android"
platform = "Android"
"#;

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub bundle: BundleConfig,
}

/// Bundle-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Reconcile revisions and rename artifacts
    #[serde(default = "default_rename")]
    pub rename: bool,

    /// Output archive file name
    #[serde(default = "default_output")]
    pub output: String,

    /// Override icon directory, relative to the working directory
    #[serde(default = "default_images_dir")]
    pub images_dir: String,

    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_rename() -> bool {
    true
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_images_dir() -> String {
    DEFAULT_IMAGES_DIR.to_string()
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            rename: default_rename(),
            output: default_output(),
            images_dir: default_images_dir(),
            platform: default_platform(),
        }
    }
}

impl BundleConfig {
    /// Check values edited by hand in `taktool.toml`.
    pub fn validate(&self) -> Result<()> {
        parse_file_name("bundle.output", &self.output)?;
        parse_inventory_text("bundle.platform", &self.platform)?;
        Ok(())
    }
}

impl Config {
    /// Load config from the working directory
    pub fn load(workdir: &Path) -> Result<Self> {
        let path = workdir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| TaktoolError::io(&path, e))?;
        let config: Config = toml::from_str(&content).map_err(|e| TaktoolError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        config.bundle.validate()?;

        Ok(config)
    }

    /// Save config to the working directory
    pub fn save(&self, workdir: &Path) -> Result<()> {
        let path = workdir.join(CONFIG_FILE);

        let content = toml::to_string_pretty(self).map_err(|e| TaktoolError::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        fs::write(&path, content).map_err(|e| TaktoolError::io(&path, e))?;
        Ok(())
    }

    /// Get config file path
    pub fn path(workdir: &Path) -> PathBuf {
        workdir.join(CONFIG_FILE)
    }

    /// Initialize config with default template (rich comments)
    pub fn init(workdir: &Path) -> Result<PathBuf> {
        let path = workdir.join(CONFIG_FILE);

        if !path.exists() {
            fs::write(&path, DEFAULT_CONFIG_TEMPLATE).map_err(|e| TaktoolError::io(&path, e))?;
        }

        Ok(path)
    }

    /// Get a config value by dot-notation key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "bundle.rename" => Some(self.bundle.rename.to_string()),
            "bundle.output" => Some(self.bundle.output.clone()),
            "bundle.images_dir" => Some(self.bundle.images_dir.clone()),
            "bundle.platform" => Some(self.bundle.platform.clone()),
            _ => None,
        }
    }

    /// Set a config value by dot-notation key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "bundle.rename" => {
                self.bundle.rename = parse_bool(key, value)?;
            }
            "bundle.output" => {
                self.bundle.output = parse_file_name(key, value)?;
            }
            "bundle.images_dir" => {
                self.bundle.images_dir = value.trim().to_string();
            }
            "bundle.platform" => {
                self.bundle.platform = parse_inventory_text(key, value)?;
            }
            _ => {
                return Err(TaktoolError::ConfigKeyNotFound {
                    key: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// List all config keys with their current values
    pub fn list(&self) -> Vec<(String, String)> {
        ["bundle.rename", "bundle.output", "bundle.images_dir", "bundle.platform"]
            .iter()
            .filter_map(|key| self.get(key).map(|value| (key.to_string(), value)))
            .collect()
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(TaktoolError::ConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// The output archive is always written next to the artifacts.
fn parse_file_name(key: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains('\\') {
        return Err(TaktoolError::ConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Values copied into `product.inf` cannot hold its delimiters.
fn parse_inventory_text(key: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.contains([',', '\n', '\r']) {
        return Err(TaktoolError::ConfigValue {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok(trimmed.to_string())
}
