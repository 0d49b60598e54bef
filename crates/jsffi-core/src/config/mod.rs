use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

use crate::bridge::FaultPolicy;
use crate::host::HostFunction;
use crate::module::{
    console_module, ModuleRegistry, RegistryBuilder, RegistryError, DEFAULT_CONSOLE_FUNCTION,
    DEFAULT_MODULE_NAME,
};
use crate::view::Termination;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub module: ModuleConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Major version of the config format this build understands.
pub const CONFIG_MAJOR_VERSION: u64 = 1;

fn default_version() -> String {
    "1.0.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            module: ModuleConfig::default(),
            host: HostConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let major = self
            .version
            .split('.')
            .next()
            .and_then(|part| part.parse::<u64>().ok());
        if major != Some(CONFIG_MAJOR_VERSION) {
            return Err(ConfigError::ValidationError(format!(
                "version '{}' is not supported (expected {CONFIG_MAJOR_VERSION}.x)",
                self.version
            )));
        }
        check_identifier("module.name", &self.module.name)?;
        check_identifier("module.console_function", &self.module.console_function)?;
        if LevelFilter::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "logging.level '{}' is not one of off, error, warn, info, debug, trace",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Build the start-up registry with the console module bound to `host`.
    pub fn build_registry(
        &self,
        host: Arc<dyn HostFunction>,
    ) -> Result<ModuleRegistry, RegistryError> {
        let module = console_module(
            &self.module.name,
            &self.module.console_function,
            host,
            self.host.fault_policy,
        );
        RegistryBuilder::new().module(module).build()
    }
}

/// Names under which the console function is exported to guest code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_module_name")]
    pub name: String,
    #[serde(default = "default_console_function")]
    pub console_function: String,
}

fn default_module_name() -> String {
    DEFAULT_MODULE_NAME.to_string()
}

fn default_console_function() -> String {
    DEFAULT_CONSOLE_FUNCTION.to_string()
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: default_module_name(),
            console_function: default_console_function(),
        }
    }
}

/// Host calling convention and failure handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub termination: Termination,
    #[serde(default)]
    pub fault_policy: FaultPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn check_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !starts_ok || !rest_ok {
        return Err(ConfigError::ValidationError(format!(
            "{field} '{value}' is not a valid identifier"
        )));
    }
    if value.len() > 4 && value.starts_with("__") && value.ends_with("__") {
        return Err(ConfigError::ValidationError(format!(
            "{field} '{value}' is reserved"
        )));
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    ParseError(String),
    #[error("failed to serialize config: {0}")]
    SerializeError(String),
    #[error("config validation failed: {0}")]
    ValidationError(String),
}
