use config::{self, File};
use log::{debug, error};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{ClientError, Result};

/// Default wall-clock interval between periodic flushes, in milliseconds
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5000;

fn default_flush_interval_ms() -> u64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

/// Configuration for a dataset collector
#[derive(Debug, Deserialize, Clone)]
pub struct CollectorConfig {
    /// Base URL of the ingestion endpoint
    pub endpoint: String,
    /// Device API key
    pub api_key: String,
    /// Name of the dataset to create
    pub name: String,
    /// Whether timestamps are generated by the device instead of the caller
    #[serde(default)]
    pub use_device_time: bool,
    /// Names of the series points may be added for
    pub time_series: Vec<String>,
    /// Free-form metadata attached to the dataset at initialization
    #[serde(default)]
    pub meta_data: Value,
    /// Dataset label of the form `labelingName_labelName`
    #[serde(default)]
    pub dataset_label: Option<String>,
    /// Interval between periodic flushes in milliseconds
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Logging level
    #[serde(default)]
    pub log_level: LogLevel,
}

impl CollectorConfig {
    /// Create a builder for a collector configuration
    pub fn builder(name: impl Into<String>) -> CollectorConfigBuilder {
        CollectorConfigBuilder::new(name)
    }

    /// Get the flush interval as a duration
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Check the configuration constraints
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(ClientError::Config("Endpoint must not be empty".to_string()));
        }
        if self.api_key.is_empty() {
            return Err(ClientError::Config("API key must not be empty".to_string()));
        }
        if self.name.is_empty() {
            return Err(ClientError::Config("Dataset name must not be empty".to_string()));
        }
        if self.time_series.is_empty() {
            return Err(ClientError::Config(
                "At least one time-series name is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for name in &self.time_series {
            if !seen.insert(name.as_str()) {
                return Err(ClientError::Config(format!(
                    "Duplicate time-series name: {}",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            name: "default_dataset".to_string(),
            use_device_time: false,
            time_series: Vec::new(),
            meta_data: Value::Null,
            dataset_label: None,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            log_level: LogLevel::default(),
        }
    }
}

/// Builder for collector configuration
pub struct CollectorConfigBuilder {
    config: CollectorConfig,
}

impl CollectorConfigBuilder {
    /// Create a new collector config builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: CollectorConfig {
                name: name.into(),
                ..Default::default()
            },
        }
    }

    /// Set the ingestion endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the device API key
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    /// Select device-generated or caller-supplied timestamps
    pub fn use_device_time(mut self, use_device_time: bool) -> Self {
        self.config.use_device_time = use_device_time;
        self
    }

    /// Set the declared series names
    pub fn time_series(mut self, time_series: Vec<String>) -> Self {
        self.config.time_series = time_series;
        self
    }

    /// Set the dataset metadata
    pub fn meta_data(mut self, meta_data: Value) -> Self {
        self.config.meta_data = meta_data;
        self
    }

    /// Set the dataset label
    pub fn dataset_label(mut self, label: impl Into<String>) -> Self {
        self.config.dataset_label = Some(label.into());
        self
    }

    /// Set the flush interval
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.config.flush_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CollectorConfig {
        self.config
    }
}

/// Logging level
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Error level
    Error,
    /// Warning level
    Warn,
    /// Info level
    Info,
    /// Debug level
    Debug,
    /// Trace level
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Load collector configuration from a file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CollectorConfig> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    if !path.exists() {
        error!("Configuration file {} does not exist", path.display());
        return Err(ClientError::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let extension = match path.extension() {
        Some(ext) => ext.to_string_lossy().to_lowercase(),
        None => {
            error!("Configuration file has no extension");
            return Err(ClientError::Config(format!(
                "Configuration file has no extension: {}",
                path.display()
            )));
        }
    };

    let format = match extension.as_str() {
        "toml" => config::FileFormat::Toml,
        "json" => config::FileFormat::Json,
        "yaml" | "yml" => config::FileFormat::Yaml,
        format => {
            error!("Unsupported configuration format: {}", format);
            return Err(ClientError::Config(format!(
                "Unsupported config format: {}",
                format
            )));
        }
    };

    let config = config::Config::builder()
        .add_source(File::with_name(&path.to_string_lossy()).format(format))
        .build()
        .map_err(|e| ClientError::Config(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ClientError::Config(e.to_string()))
}
