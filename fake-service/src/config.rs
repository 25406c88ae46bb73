//! Configuration loading for fake-service.
//!
//! Configuration is loaded from a TOML file (default: `fake-service.toml`).
//! Every section and field is optional and falls back to its default.

use fake_core::{GeneratorConfig, RequestDuration, MIB};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::inject::RateInjector;

/// Root configuration for fake-service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Service identity and upstreams.
    #[serde(default)]
    pub service: ServiceConfig,
    /// Request duration distribution.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Synthetic CPU and memory load.
    #[serde(default)]
    pub load: LoadConfig,
    /// Error injection.
    #[serde(default)]
    pub errors: ErrorsConfig,
    /// Logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Name reported in the response tree (default: "Service").
    #[serde(default = "default_name")]
    pub name: String,
    /// Response body; JSON objects are embedded as JSON (default: "Hello World").
    #[serde(default = "default_message")]
    pub message: String,
    /// Bind address for the HTTP listener (default: 0.0.0.0:9090).
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Upstream URIs called on every request, in order.
    #[serde(default)]
    pub upstream_uris: Vec<String>,
    /// Concurrent upstream calls per request (default: 1).
    #[serde(default = "default_upstream_workers")]
    pub upstream_workers: usize,
    /// Timeout for a single upstream call in milliseconds (default: 30000).
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
    /// Time after startup before /ready reports ready, in milliseconds
    /// (default: 0).
    #[serde(default)]
    pub ready_delay_ms: u64,
}

/// Request duration distribution, all in milliseconds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimingConfig {
    /// Median request duration.
    #[serde(default)]
    pub p50_ms: u64,
    /// 90th percentile request duration.
    #[serde(default)]
    pub p90_ms: u64,
    /// 99th percentile request duration.
    #[serde(default)]
    pub p99_ms: u64,
    /// Jitter applied to every drawn duration, in percent.
    #[serde(default)]
    pub variance_percent: u32,
}

/// Synthetic load configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// CPU lanes kept busy while a request is handled (default: 0, disabled).
    #[serde(default)]
    pub cpu_cores: usize,
    /// Busy percentage of each CPU lane, 0-100 (default: 0).
    #[serde(default)]
    pub cpu_percentage: f64,
    /// Baseline memory allocated per tick in MiB (default: 0).
    #[serde(default)]
    pub memory_mib: u64,
    /// Baseline memory held for the lifetime of the process in MiB, with the
    /// same variance settings (default: 0, disabled).
    #[serde(default)]
    pub process_memory_mib: u64,
    /// Memory variance as a percentage of the baseline (default: 0, disabled).
    #[serde(default)]
    pub memory_variance_percent: u32,
    /// Variance model: "linear", "random" or "sine"; anything else disables variance.
    #[serde(default)]
    pub memory_variance_func: String,
    /// Length of one variance period in seconds (default: 60).
    #[serde(default = "default_variance_period_secs")]
    pub memory_variance_period_secs: u64,
}

/// Error injection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorsConfig {
    /// Fraction of requests answered with an injected error, 0-1 (default: 0).
    #[serde(default)]
    pub rate: f64,
    /// Status code of injected errors (default: 500).
    #[serde(default = "default_error_code")]
    pub code: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_name() -> String {
    "Service".to_string()
}

fn default_message() -> String {
    "Hello World".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_upstream_workers() -> usize {
    1
}

fn default_upstream_timeout_ms() -> u64 {
    30_000
}

fn default_variance_period_secs() -> u64 {
    60
}

fn default_error_code() -> u16 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            message: default_message(),
            listen: default_listen(),
            upstream_uris: Vec::new(),
            upstream_workers: default_upstream_workers(),
            upstream_timeout_ms: default_upstream_timeout_ms(),
            ready_delay_ms: 0,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            cpu_cores: 0,
            cpu_percentage: 0.0,
            memory_mib: 0,
            process_memory_mib: 0,
            memory_variance_percent: 0,
            memory_variance_func: String::new(),
            memory_variance_period_secs: default_variance_period_secs(),
        }
    }
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            rate: 0.0,
            code: default_error_code(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.upstream_workers == 0 {
            return Err(ConfigError::invalid(
                "service.upstream_workers",
                "must be at least 1",
            ));
        }
        self.generator_config()?;
        self.process_generator_config()?;
        self.request_duration()?;
        self.injector()?;
        Ok(())
    }

    /// Load generator configuration.
    pub fn generator_config(&self) -> Result<GeneratorConfig, ConfigError> {
        let load = &self.load;
        GeneratorConfig::new(
            load.cpu_cores,
            load.cpu_percentage / 100.0,
            load.memory_mib.saturating_mul(MIB),
            load.memory_variance_percent,
            &load.memory_variance_func,
            Duration::from_secs(load.memory_variance_period_secs),
        )
        .map_err(|e| ConfigError::invalid("load", e))
    }

    /// Process-wide memory generator configuration, if one is enabled.
    pub fn process_generator_config(&self) -> Result<Option<GeneratorConfig>, ConfigError> {
        let load = &self.load;
        if load.process_memory_mib == 0 {
            return Ok(None);
        }
        GeneratorConfig::new(
            0,
            0.0,
            load.process_memory_mib.saturating_mul(MIB),
            load.memory_variance_percent,
            &load.memory_variance_func,
            Duration::from_secs(load.memory_variance_period_secs),
        )
        .map(Some)
        .map_err(|e| ConfigError::invalid("load", e))
    }

    /// Request duration distribution.
    pub fn request_duration(&self) -> Result<RequestDuration, ConfigError> {
        let timing = &self.timing;
        RequestDuration::new(
            Duration::from_millis(timing.p50_ms),
            Duration::from_millis(timing.p90_ms),
            Duration::from_millis(timing.p99_ms),
            timing.variance_percent,
        )
        .map_err(|e| ConfigError::invalid("timing", e))
    }

    /// Error injector.
    pub fn injector(&self) -> Result<RateInjector, ConfigError> {
        RateInjector::new(self.errors.rate, self.errors.code)
            .map_err(|e| ConfigError::invalid("errors", e))
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// A value parsed but is not usable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field or section.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Invalid {
            field,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake_core::VarianceModel;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.service.listen, "0.0.0.0:9090");
        assert_eq!(config.service.upstream_workers, 1);
        assert_eq!(config.errors.code, 500);
        config.validate().unwrap();
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[service]
name = "web"
listen = "127.0.0.1:8080"
upstream_uris = ["http://api:9090", "http://cache:9090"]
upstream_workers = 2

[timing]
p50_ms = 20
p90_ms = 30
p99_ms = 40
variance_percent = 10

[load]
cpu_cores = 2
cpu_percentage = 25.0
memory_mib = 100
memory_variance_percent = 20
memory_variance_func = "sine"
memory_variance_period_secs = 30

[errors]
rate = 0.2
code = 503
"#;

        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();
        assert_eq!(config.service.name, "web");
        assert_eq!(config.service.upstream_uris.len(), 2);
        assert_eq!(config.timing.p99_ms, 40);

        let generator = config.generator_config().unwrap();
        assert_eq!(generator.cpu_cores(), 2);
        assert_eq!(generator.cpu_duty_cycle(), 0.25);
        assert_eq!(generator.baseline_bytes(), 100 * 1024 * 1024);
        assert_eq!(generator.variance_model(), VarianceModel::Sine);
        assert_eq!(generator.variance_period(), Duration::from_secs(30));
    }

    #[test]
    fn config_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.service.name, "Service");
        assert_eq!(config.service.message, "Hello World");
        assert_eq!(config.load.memory_variance_period_secs, 60);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_workers_rejected() {
        let config: Config = toml::from_str("[service]\nupstream_workers = 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "service.upstream_workers",
                ..
            }
        ));
    }

    #[test]
    fn cpu_percentage_out_of_range_rejected() {
        let config: Config = toml::from_str("[load]\ncpu_cores = 1\ncpu_percentage = 150.0\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "load", .. })
        ));
    }

    #[test]
    fn unordered_timing_rejected() {
        let config: Config = toml::from_str("[timing]\np50_ms = 50\np90_ms = 10\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "timing", .. })
        ));
    }

    #[test]
    fn error_rate_out_of_range_rejected() {
        let config: Config = toml::from_str("[errors]\nrate = 1.5\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "errors", .. })
        ));
    }

    #[test]
    fn unknown_variance_func_is_not_an_error() {
        let config: Config = toml::from_str(
            "[load]\nmemory_mib = 10\nmemory_variance_percent = 10\nmemory_variance_func = \"square\"\n",
        )
        .unwrap();
        let generator = config.generator_config().unwrap();
        assert_eq!(generator.variance_model(), VarianceModel::Zero);
    }

    #[test]
    fn process_generator_is_memory_only_with_shared_variance() {
        let config: Config = toml::from_str(
            "[load]\ncpu_cores = 2\ncpu_percentage = 50.0\nprocess_memory_mib = 8\nmemory_variance_percent = 20\nmemory_variance_func = \"sine\"\n",
        )
        .unwrap();
        let process = config.process_generator_config().unwrap().unwrap();
        assert!(!process.cpu_enabled());
        assert_eq!(process.baseline_bytes(), 8 * 1024 * 1024);
        assert_eq!(process.variance_percent(), 20);
        assert_eq!(process.variance_model(), VarianceModel::Sine);

        assert!(Config::default().process_generator_config().unwrap().is_none());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service]\nname = \"payments\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.service.name, "payments");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::from_file(std::path::Path::new("/nonexistent/fake-service.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[service\nname = ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
