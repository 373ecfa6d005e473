//! Configuration models for queue capacity and job defaults.

use serde::{Deserialize, Serialize};

use crate::core::settings::{JobSettings, DEFAULT_PRIORITY, DEFAULT_QUEUE};

/// Queue capacity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of sort keys held in memory.
    pub max_size: usize,
}

/// Library-wide job defaults applied when no per-type override exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefaults {
    /// Default queue name.
    #[serde(default)]
    pub queue: String,
    /// Default priority; lower values are more urgent.
    pub priority: i32,
    /// Run jobs in-process at enqueue time instead of persisting them.
    #[serde(default)]
    pub run_synchronously: bool,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            queue: DEFAULT_QUEUE.to_string(),
            priority: DEFAULT_PRIORITY,
            run_synchronously: false,
        }
    }
}

impl JobDefaults {
    /// Build a root settings object suitable as the ancestor for every
    /// registered job type.
    #[must_use]
    pub fn to_settings(&self) -> JobSettings {
        JobSettings {
            queue: Some(self.queue.clone()),
            priority: Some(self.priority),
            run_synchronously: Some(self.run_synchronously),
            ..JobSettings::default()
        }
    }
}

/// Root configuration for the coordination core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Queue capacity settings.
    pub queue: QueueConfig,
    /// Library-wide job defaults.
    #[serde(default)]
    pub defaults: JobDefaults,
}

impl QueueConfig {
    /// Validate queue configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_size == 0 {
            return Err("max_size must be greater than 0".into());
        }
        Ok(())
    }
}

impl CoreConfig {
    /// Validate the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        self.queue
            .validate()
            .map_err(|e| format!("queue invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_max_size_invalid() {
        let cfg = QueueConfig { max_size: 0 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_str() {
        let cfg = CoreConfig::from_json_str(
            r#"{"queue": {"max_size": 8}, "defaults": {"priority": 50}}"#,
        )
        .unwrap();
        assert_eq!(cfg.queue.max_size, 8);
        assert_eq!(cfg.defaults.priority, 50);
        assert_eq!(cfg.defaults.queue, "");
        assert!(!cfg.defaults.run_synchronously);
    }

    #[test]
    fn test_from_json_str_rejects_invalid() {
        let result = CoreConfig::from_json_str(r#"{"queue": {"max_size": 0}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_to_settings() {
        let defaults = JobDefaults {
            queue: "mail".into(),
            priority: 10,
            run_synchronously: true,
        };
        let resolved = defaults.to_settings().resolve();
        assert_eq!(resolved.queue, "mail");
        assert_eq!(resolved.priority, 10);
        assert!(resolved.run_synchronously);
    }
}
