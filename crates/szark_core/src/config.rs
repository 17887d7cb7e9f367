//! Configuration system
//!
//! Defaults for window creation, vsync and logging. Loaded once by
//! `InitializeLibraries` from the file named by [`CONFIG_ENV_VAR`], if set.

pub use serde::{Deserialize, Serialize};

/// Environment variable naming an optional configuration file
pub const CONFIG_ENV_VAR: &str = "SZARK_CONFIG";

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::parse(path, &contents)
    }

    /// Parse `contents`, picking the format from `path`'s extension
    fn parse(path: &str, contents: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Fallbacks applied by `Create` when the host passes zero or null
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDefaults {
    /// Title used for a null title pointer
    pub title: String,
    /// Width used for a zero width
    pub width: u32,
    /// Height used for a zero height
    pub height: u32,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        Self {
            title: "New Window".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Library-wide configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Window creation fallbacks
    pub window: WindowDefaults,
    /// Swap interval applied when a window is shown
    pub vsync: bool,
    /// `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            window: WindowDefaults::default(),
            vsync: true,
            log_filter: "warn".to_string(),
        }
    }
}

impl Config for CoreConfig {}

impl CoreConfig {
    /// Load from [`CONFIG_ENV_VAR`], or defaults when it is unset
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_window_fallbacks() {
        let config = CoreConfig::default();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.window.title, "New Window");
        assert!(config.vsync);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CoreConfig::parse("szark.toml", "vsync = false\n[window]\nwidth = 1024\n")
            .unwrap();
        assert!(!config.vsync);
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_ron_config() {
        let config = CoreConfig::parse(
            "szark.ron",
            "(window: (title: \"Game\"), log_filter: \"debug\")",
        )
        .unwrap();
        assert_eq!(config.window.title, "Game");
        assert_eq!(config.window.width, 800);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = CoreConfig::parse("szark.json", "{}").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = CoreConfig::parse("szark.toml", "vsync = \"maybe\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_save_and_load_roundtrip_through_file() {
        let path = std::env::temp_dir().join(format!("szark_config_{}.toml", std::process::id()));
        let path = path.to_string_lossy().into_owned();
        let mut config = CoreConfig::default();
        config.window.title = "Saved".to_string();
        config.save_to_file(&path).unwrap();
        let loaded = CoreConfig::load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
