//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "environment": "sandbox", "demoMode": false },
//!   "disabledPlugins": []
//! }
//! ```
//! Fields this crate does not manage are kept untouched on save.
//!
//! The API key is stored separately, as a single line in `.api_key`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Environment;

pub const SETTINGS_FILE: &str = "settings.json";
pub const API_KEY_FILE: &str = ".api_key";

/// Environment variable overriding the configured environment
pub const ENVIRONMENT_ENV: &str = "PROMETEO_ENVIRONMENT";
/// Environment variable forcing demo mode on or off (for CI/testing)
pub const DEMO_MODE_ENV: &str = "PROMETEO_DEMO_MODE";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(default)]
    disabled_plugins: Vec<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    environment: Option<String>,
    #[serde(default)]
    demo_mode: bool,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Application configuration (simplified view of settings)
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub environment: Environment,
    pub demo_mode: bool,
    pub disabled_plugins: Vec<String>,
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing or unreadable settings file yields the defaults. The
    /// environment and demo mode can be overridden with `PROMETEO_ENVIRONMENT`
    /// and `PROMETEO_DEMO_MODE`.
    pub fn load(dir: &Path) -> Result<Self> {
        let raw = read_settings(dir)?;

        let mut config = Self {
            environment: Environment::default(),
            demo_mode: raw.app.demo_mode,
            disabled_plugins: raw.disabled_plugins,
        };
        if let Some(name) = raw.app.environment.as_deref() {
            config.environment = parse_environment(name)?;
        }

        config.apply_overrides(
            std::env::var(ENVIRONMENT_ENV).ok().as_deref(),
            std::env::var(DEMO_MODE_ENV).ok().as_deref(),
        )?;
        Ok(config)
    }

    fn apply_overrides(&mut self, environment: Option<&str>, demo_mode: Option<&str>) -> Result<()> {
        if let Some(name) = environment.filter(|s| !s.trim().is_empty()) {
            self.environment = parse_environment(name)?;
        }
        match demo_mode {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => self.demo_mode = true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => self.demo_mode = false,
            _ => {}
        }
        Ok(())
    }

    /// Persist `environment` as the startup environment.
    ///
    /// Re-reads the file first so every other setting survives.
    pub fn save_environment(dir: &Path, environment: Environment) -> Result<()> {
        let mut settings = read_settings(dir)?;
        settings.app.environment = Some(environment.as_str().to_string());

        std::fs::create_dir_all(dir)?;
        let path = dir.join(SETTINGS_FILE);
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Whether a plugin is listed in `disabledPlugins` (case-insensitive)
    pub fn is_plugin_disabled(&self, name: &str) -> bool {
        self.disabled_plugins
            .iter()
            .any(|disabled| disabled.eq_ignore_ascii_case(name))
    }
}

fn read_settings(dir: &Path) -> Result<SettingsFile> {
    let path = dir.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

fn parse_environment(name: &str) -> Result<Environment> {
    name.parse::<Environment>()
        .with_context(|| format!("Invalid environment in configuration: {}", name))
}

/// Plain-text storage for the API key
#[derive(Debug, Clone)]
pub struct ApiKeyStore {
    path: PathBuf,
}

impl ApiKeyStore {
    /// Key store at `<dir>/.api_key`
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(API_KEY_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the stored key. The first line, trimmed; `None` when the file
    /// is missing or blank.
    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let key = content.lines().next().unwrap_or("").trim();
        Ok((!key.is_empty()).then(|| key.to_string()))
    }

    /// Write the key, replacing any previous one
    pub fn save(&self, key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, format!("{}\n", key.trim()))
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
