//! Configuration schema types for `figbatch.toml`
//!
//! Defines the structure and validation rules for figbatch configuration.

use serde::{Deserialize, Serialize};

use crate::models::{AnimationOptions, Easing, DEFAULT_DURATION_MS};
use crate::schema::Validation;

/// Log levels accepted by `logging.level`.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Default options for animate scopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationConfig {
    /// Easing curve name (e.g. "cubic-in-out", "elastic")
    #[serde(default = "default_easing")]
    pub easing: String,
    /// Transition duration in milliseconds
    #[serde(default = "default_duration")]
    pub duration: u64,
}

fn default_easing() -> String {
    Easing::default().to_string()
}

fn default_duration() -> u64 {
    DEFAULT_DURATION_MS
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { easing: default_easing(), duration: default_duration() }
    }
}

impl AnimationConfig {
    /// Resolve into scope options. Fails on an unknown easing name.
    pub fn to_options(&self) -> Result<AnimationOptions, String> {
        AnimationOptions::parse(&self.easing, self.duration)
    }
}

/// Property validation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateConfig {
    /// Reject writes to unknown property paths
    #[serde(default = "default_true")]
    pub strict: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

impl ValidateConfig {
    pub fn validation(&self) -> Validation {
        if self.strict {
            Validation::Strict
        } else {
            Validation::Lenient
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

/// Complete figbatch.toml configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FigConfig {
    /// Animate scope defaults
    #[serde(default)]
    pub animation: AnimationConfig,
    /// Validation settings
    #[serde(default)]
    pub validate: ValidateConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "animation.easing")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "figbatch.toml: '{}' {}", self.field, self.message)
    }
}

impl FigConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if let Err(message) = self.animation.to_options() {
            errors.push(ConfigValidationError { field: "animation.easing".to_string(), message });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            errors.push(ConfigValidationError {
                field: "logging.level".to_string(),
                message: format!("must be one of {}", LOG_LEVELS.join(", ")),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config: FigConfig = toml::from_str("").unwrap();
        assert_eq!(config, FigConfig::default());
        assert_eq!(config.animation.easing, "cubic-in-out");
        assert_eq!(config.animation.duration, 500);
        assert!(config.validate.strict);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_full_toml() {
        let config: FigConfig = toml::from_str(
            r#"
[animation]
easing = "elastic"
duration = 1200

[validate]
strict = false

[logging]
level = "debug"
"#,
        )
        .unwrap();
        let opts = config.animation.to_options().unwrap();
        assert_eq!(opts.easing.to_string(), "elastic");
        assert_eq!(opts.duration, 1200);
        assert_eq!(config.validate.validation(), Validation::Lenient);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_negative_duration_rejected_by_parser() {
        let result: Result<FigConfig, _> = toml::from_str("[animation]\nduration = -5\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = FigConfig::default();
        config.animation.easing = "wobble".to_string();
        config.logging.level = "loud".to_string();

        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].field, "animation.easing");
        assert_eq!(errors[1].field, "logging.level");
        assert!(errors[1].to_string().starts_with("figbatch.toml: 'logging.level'"));
    }
}
