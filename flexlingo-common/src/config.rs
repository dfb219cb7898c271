//! Configuration loading for FlexLingo services
//!
//! Bootstrap configuration comes from a TOML file. Resolution order:
//! 1. Explicit path (command-line argument)
//! 2. `FLEXLINGO_CONFIG` environment variable
//! 3. `<config dir>/flexlingo/server.toml` if it exists
//! 4. Compiled defaults
//!
//! A missing file at step 3 is not an error: the service starts on defaults.
//! A file named explicitly at steps 1-2 must exist and parse.

use crate::device::{DeviceId, ModelSelector, PortDescriptor};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "FLEXLINGO_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub predictor: PredictorConfig,
    pub ports: PortsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    /// Default: 5001 (the port the browser UI expects)
    pub port: u16,

    /// Device checked by `/status` when the caller names none
    pub default_device: DeviceId,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
            default_device: DeviceId::new("COM7"),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// External predictor invocation settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Program used to run the scripts. Empty means execute the script itself.
    pub interpreter: String,

    /// Upper bound on one predictor run
    pub timeout_secs: u64,

    /// Cap applied to each of stdout and stderr
    pub max_output_bytes: usize,

    pub scripts: ScriptsConfig,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            interpreter: "python".to_string(),
            timeout_secs: 30,
            max_output_bytes: 1024 * 1024,
            scripts: ScriptsConfig::default(),
        }
    }
}

impl PredictorConfig {
    pub fn interpreter(&self) -> Option<&str> {
        let trimmed = self.interpreter.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Script path per model selector
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub rf: PathBuf,
    pub bilstm: PathBuf,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            rf: PathBuf::from("server/predict_rf.py"),
            bilstm: PathBuf::from("server/predict_sign.py"),
        }
    }
}

impl ScriptsConfig {
    pub fn script_for(&self, model: ModelSelector) -> &Path {
        match model {
            ModelSelector::Rf => &self.rf,
            ModelSelector::Bilstm => &self.bilstm,
        }
    }
}

/// Where serial ports are enumerated from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSource {
    /// Host serial port facility
    #[default]
    System,
    /// Static list from `ports.fixed`
    Fixed,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PortsConfig {
    pub source: PortSource,
    pub fixed: Vec<PortDescriptor>,
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Command-line overrides applied after the file is loaded
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse and validate configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration
    pub fn load(cli_arg: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match resolve_config_path(cli_arg) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(host) = &overrides.host {
            self.server.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(level) = &overrides.log_level {
            self.logging.level = level.clone();
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(Error::Config("server.host must not be empty".to_string()));
        }
        if self.server.default_device.is_empty() {
            return Err(Error::Config(
                "server.default_device must not be empty".to_string(),
            ));
        }
        if self.predictor.timeout_secs == 0 {
            return Err(Error::Config(
                "predictor.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.predictor.max_output_bytes == 0 {
            return Err(Error::Config(
                "predictor.max_output_bytes must be greater than 0".to_string(),
            ));
        }
        for model in ModelSelector::ALL {
            if self.predictor.scripts.script_for(model).as_os_str().is_empty() {
                return Err(Error::Config(format!(
                    "predictor.scripts.{} must not be empty",
                    model
                )));
            }
        }
        Ok(())
    }
}

/// Pick the configuration file to load, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Per-user configuration file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flexlingo").join("server.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.server.default_device.as_str(), "COM7");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.predictor.interpreter(), Some("python"));
        assert_eq!(config.predictor.max_output_bytes, 1024 * 1024);
        assert_eq!(config.ports.source, PortSource::System);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_interpreter_means_direct_exec() {
        let config = TomlConfig::from_toml_str("[predictor]\ninterpreter = \"  \"\n").unwrap();
        assert_eq!(config.predictor.interpreter(), None);
    }

    #[test]
    fn test_script_for_model() {
        let scripts = ScriptsConfig::default();
        assert_eq!(scripts.script_for(ModelSelector::Rf), Path::new("server/predict_rf.py"));
        assert_eq!(
            scripts.script_for(ModelSelector::Bilstm),
            Path::new("server/predict_sign.py")
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = TomlConfig::from_toml_str("[predictor]\ntimeout_secs = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let mut config = TomlConfig::default();
        config
            .apply_overrides(&ConfigOverrides {
                host: Some("0.0.0.0".to_string()),
                port: Some(8080),
                log_level: None,
            })
            .unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.logging.level, "info");
    }
}
