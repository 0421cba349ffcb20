//! Configuration loading and discovery for `figbatch.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::FigConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up on disk.
pub const CONFIG_FILE_NAME: &str = "figbatch.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse figbatch.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override easing curve name
    pub easing: Option<String>,
    /// Override duration in milliseconds
    pub duration: Option<u64>,
    /// Override strict validation
    pub strict: Option<bool>,
    /// Override log level
    pub log_level: Option<String>,
}

/// Find figbatch.toml by walking up from the current working directory.
///
/// Search order:
/// 1. Walk up from current directory looking for figbatch.toml
/// 2. Check XDG_CONFIG_HOME/figbatch/figbatch.toml (or ~/.config/figbatch/figbatch.toml)
pub fn find_config() -> Option<PathBuf> {
    if let Ok(cwd) = env::current_dir() {
        if let Some(path) = find_config_from(cwd) {
            return Some(path);
        }
    }

    find_xdg_config()
}

/// Find figbatch.toml in the XDG config directory.
pub fn find_xdg_config() -> Option<PathBuf> {
    let xdg_config = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;

    let config_path = xdg_config.join("figbatch").join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Find figbatch.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a figbatch.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// `find_config()` to locate the config file. If no config file is found,
/// returns the default configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("project/figbatch.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<FigConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(FigConfig::default()),
    }
}

fn load_config_file(path: &Path) -> Result<FigConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: FigConfig = toml::from_str(&contents)?;
    check(&config)?;
    Ok(config)
}

fn check(config: &FigConfig) -> Result<(), ConfigError> {
    let errors = config.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()))
    }
}

/// Merge CLI overrides into a configuration and re-validate it.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(
    config: &mut FigConfig,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(ref easing) = overrides.easing {
        config.animation.easing = easing.clone();
    }

    if let Some(duration) = overrides.duration {
        config.animation.duration = duration;
    }

    if let Some(strict) = overrides.strict {
        config.validate.strict = strict;
    }

    if let Some(ref level) = overrides.log_level {
        config.logging.level = level.clone();
    }

    check(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, contents: &[u8]) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(contents)
            .expect("should write config content");
        config_path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[animation]\nduration = 100");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"");

        let subdir = temp.path().join("figures").join("weekly");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    #[serial]
    fn test_find_xdg_config() {
        let temp = TempDir::new().expect("should create temp dir");
        let dir = temp.path().join("figbatch");
        fs::create_dir_all(&dir).expect("should create xdg dir");
        let config_path = write_config(&dir, b"");

        let previous = env::var("XDG_CONFIG_HOME").ok();
        env::set_var("XDG_CONFIG_HOME", temp.path());
        let found = find_xdg_config();
        match previous {
            Some(v) => env::set_var("XDG_CONFIG_HOME", v),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }

        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            br#"
[animation]
easing = "elastic"
duration = 1200

[validate]
strict = false
"#,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.animation.easing, "elastic");
        assert_eq!(config.animation.duration, 1200);
        assert!(!config.validate.strict);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join("nonexistent.toml");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), b"[animation]\neasing = \"wobble\"\n");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = FigConfig::default();
        let overrides = CliOverrides {
            easing: Some("bounce-out".to_string()),
            duration: Some(250),
            strict: Some(false),
            ..Default::default()
        };

        merge_cli_overrides(&mut config, &overrides).expect("overrides are valid");
        assert_eq!(config.animation.easing, "bounce-out");
        assert_eq!(config.animation.duration, 250);
        assert!(!config.validate.strict);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_merge_cli_overrides_rejects_bad_easing() {
        let mut config = FigConfig::default();
        let overrides = CliOverrides { easing: Some("wobble".to_string()), ..Default::default() };

        let result = merge_cli_overrides(&mut config, &overrides);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
