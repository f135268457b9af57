// src/config.rs

//! Configuration for the engine and its window.
//!
//! Every struct deserializes with `#[serde(default)]`, so a config file only
//! needs the keys it wants to change. The defaults reproduce the classic
//! 256x256 window at (16, 16) with a one pixel border.

use anyhow::{bail, Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "RAPTURE_CONFIG";

/// Process-wide configuration, loaded once on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window placement and decoration.
    pub window: WindowConfig,
    /// Engine thread behaviour.
    pub engine: EngineConfig,
}

/// Position and size of a window, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Settings for the platform window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Border width in pixels.
    pub border_width: u32,
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            x: 16,
            y: 16,
            width: 256,
            height: 256,
            border_width: 1,
            title: "Rapture Pixel Engine".to_string(),
        }
    }
}

impl WindowConfig {
    pub fn geometry(&self) -> WindowGeometry {
        WindowGeometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

/// Settings for the engine thread and its poll loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Spawn a background thread that waits for `start()` and then polls.
    /// When false the caller drives the loop with `run()`.
    pub threaded: bool,
    /// Upper bound on the sleep between two polls of the platform, in
    /// milliseconds. A stop request interrupts the sleep.
    pub poll_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            threaded: true,
            poll_interval_ms: 4,
        }
    }
}

impl Config {
    /// Parses a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).context("Failed to parse configuration JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Loads the file named by `RAPTURE_CONFIG`, falling back to defaults
    /// when the variable is unset or the file is unusable.
    pub fn load_or_default() -> Self {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    info!("Configuration loaded from {}", Path::new(&path).display());
                    config
                }
                Err(e) => {
                    warn!("{:#}. Using default configuration.", e);
                    Config::default()
                }
            },
            None => {
                info!("{} not set, using default configuration.", CONFIG_ENV_VAR);
                Config::default()
            }
        }
    }

    /// Rejects values no platform window or poll loop can work with.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            bail!(
                "Window size must be non-zero, got {}x{}",
                self.window.width,
                self.window.height
            );
        }
        if self.window.title.contains('\0') {
            bail!("Window title must not contain NUL characters");
        }
        if self.engine.poll_interval_ms == 0 {
            bail!("engine.poll_interval_ms must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test_log::test]
    fn defaults_match_classic_window() {
        let config = Config::default();
        assert_eq!(
            config.window.geometry(),
            WindowGeometry {
                x: 16,
                y: 16,
                width: 256,
                height: 256
            }
        );
        assert_eq!(config.window.border_width, 1);
        assert!(config.engine.threaded);
        assert!(config.validate().is_ok());
    }

    #[test_log::test]
    fn partial_json_keeps_other_defaults() -> Result<()> {
        let config = Config::from_json_str(r#"{ "window": { "width": 640, "title": "demo" } }"#)?;
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 256);
        assert_eq!(config.window.title, "demo");
        assert_eq!(config.engine, EngineConfig::default());
        Ok(())
    }

    #[test_log::test]
    fn empty_object_is_default() -> Result<()> {
        assert_eq!(Config::from_json_str("{}")?, Config::default());
        Ok(())
    }

    #[test_log::test]
    fn zero_sized_window_is_rejected() {
        let err = Config::from_json_str(r#"{ "window": { "height": 0 } }"#).unwrap_err();
        assert!(format!("{:#}", err).contains("non-zero"));
    }

    #[test_log::test]
    fn title_with_nul_is_rejected() {
        let err = Config::from_json_str(r#"{ "window": { "title": "bad\u0000title" } }"#).unwrap_err();
        assert!(format!("{:#}", err).contains("NUL"));
    }

    #[test_log::test]
    fn zero_poll_interval_is_rejected() {
        assert!(Config::from_json_str(r#"{ "engine": { "poll_interval_ms": 0 } }"#).is_err());
    }

    #[test_log::test]
    fn malformed_json_is_an_error() {
        assert!(Config::from_json_str("{ window: ").is_err());
    }

    #[test_log::test]
    fn load_reads_file_and_reports_missing_path() -> Result<()> {
        let path = std::env::temp_dir().join(format!(
            "rapture-config-test-{}.json",
            std::process::id()
        ));
        {
            let mut file = std::fs::File::create(&path)?;
            file.write_all(br#"{ "engine": { "threaded": false } }"#)?;
        }
        let config = Config::load(&path)?;
        assert!(!config.engine.threaded);
        std::fs::remove_file(&path)?;

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
        Ok(())
    }
}
