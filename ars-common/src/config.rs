//! Configuration loading and validation
//!
//! One TOML document configures every component. Each component receives its own
//! section by value at construction; nothing reads configuration globally.
//!
//! # Config file priority
//! 1. Command-line argument (`--config`)
//! 2. Environment variable (`ARS_CONFIG`)
//! 3. `<user config dir>/ars/config.toml`
//! 4. `/etc/ars/config.toml`
//! 5. Built-in defaults (no file)
//!
//! Service addresses can additionally be overridden with `ARS_CAMERA_URL`,
//! `ARS_CLASSIFIER_URL` and `ARS_BROKER_HOST`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ARS_CONFIG";
pub const CAMERA_URL_ENV_VAR: &str = "ARS_CAMERA_URL";
pub const CLASSIFIER_URL_ENV_VAR: &str = "ARS_CLASSIFIER_URL";
pub const BROKER_HOST_ENV_VAR: &str = "ARS_BROKER_HOST";

/// Largest accepted `ambiguity.threshold_ms` (one hour)
pub const MAX_THRESHOLD_MS: u64 = 3_600_000;

/// Complete service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArsConfig {
    #[serde(default)]
    pub ambiguity: AmbiguityConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sliding-window ambiguity test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguityConfig {
    /// Adjacent events closer than this are ambiguous (milliseconds)
    #[serde(default = "default_threshold_ms")]
    pub threshold_ms: u64,

    /// Number of most recent events kept
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
}

/// Image burst acquisition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture attempts per burst
    #[serde(default = "default_number_of_frames")]
    pub number_of_frames: usize,

    /// Pause between capture attempts (milliseconds)
    #[serde(default = "default_waiting_time_ms")]
    pub waiting_time_ms: u64,
}

/// Camera service endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_url")]
    pub base_url: String,

    /// Bound on every camera request (milliseconds)
    #[serde(default = "default_camera_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Classifier service endpoint and decision threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_classifier_url")]
    pub base_url: String,

    #[serde(default = "default_classifier_endpoint")]
    pub endpoint: String,

    /// Minimum confidence for an automatic decision (inclusive)
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Bound on the classify request (milliseconds)
    #[serde(default = "default_classifier_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// MQTT broker connection and topics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,

    #[serde(default = "default_broker_port")]
    pub port: u16,

    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Inbound topic carrying raw XES events
    #[serde(default = "default_raw_topic")]
    pub raw_topic: String,

    /// Topic for clean and reconciled events
    #[serde(default = "default_resolved_topic", alias = "resolved-topic")]
    pub resolved_topic: String,

    /// Topic for batches needing manual review
    #[serde(default = "default_escalated_topic", alias = "escalated-topic")]
    pub escalated_topic: String,

    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,

    /// Bound on handing one publish to the broker (milliseconds)
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,

    /// Raw events buffered between ingestion and the orchestration worker
    #[serde(default = "default_inbound_queue_capacity")]
    pub inbound_queue_capacity: usize,
}

/// HTTP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_threshold_ms() -> u64 {
    400
}

fn default_window_capacity() -> usize {
    6
}

fn default_number_of_frames() -> usize {
    5
}

fn default_waiting_time_ms() -> u64 {
    500
}

fn default_camera_url() -> String {
    "http://localhost:8003".to_string()
}

fn default_camera_timeout_ms() -> u64 {
    5_000
}

fn default_classifier_url() -> String {
    "http://localhost:8001".to_string()
}

fn default_classifier_endpoint() -> String {
    "/analyze-frames".to_string()
}

fn default_confidence_threshold() -> f64 {
    0.95
}

fn default_classifier_timeout_ms() -> u64 {
    30_000
}

fn default_broker_host() -> String {
    "localhost".to_string()
}

fn default_broker_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "ars-orchestrator".to_string()
}

fn default_raw_topic() -> String {
    "topic/test".to_string()
}

fn default_resolved_topic() -> String {
    "ars/events/resolved".to_string()
}

fn default_escalated_topic() -> String {
    "ars/events/escalated".to_string()
}

fn default_keep_alive_secs() -> u64 {
    30
}

fn default_publish_timeout_ms() -> u64 {
    5_000
}

fn default_inbound_queue_capacity() -> usize {
    256
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AmbiguityConfig {
    fn default() -> Self {
        Self {
            threshold_ms: default_threshold_ms(),
            window_capacity: default_window_capacity(),
        }
    }
}

impl AmbiguityConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            number_of_frames: default_number_of_frames(),
            waiting_time_ms: default_waiting_time_ms(),
        }
    }
}

impl CaptureConfig {
    pub fn waiting_time(&self) -> Duration {
        Duration::from_millis(self.waiting_time_ms)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            base_url: default_camera_url(),
            request_timeout_ms: default_camera_timeout_ms(),
        }
    }
}

impl CameraConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: default_classifier_url(),
            endpoint: default_classifier_endpoint(),
            confidence_threshold: default_confidence_threshold(),
            request_timeout_ms: default_classifier_timeout_ms(),
        }
    }
}

impl ClassifierConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Full URL of the classify operation
    pub fn classify_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint.trim_start_matches('/')
        )
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            client_id: default_client_id(),
            raw_topic: default_raw_topic(),
            resolved_topic: default_resolved_topic(),
            escalated_topic: default_escalated_topic(),
            keep_alive_secs: default_keep_alive_secs(),
            publish_timeout_ms: default_publish_timeout_ms(),
            inbound_queue_capacity: default_inbound_queue_capacity(),
        }
    }
}

impl BrokerConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_millis(self.publish_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ArsConfig {
    /// Parse a TOML document; absent keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration following the priority order in the module docs
    ///
    /// A file named explicitly (CLI or `ARS_CONFIG`) must exist. Missing files in
    /// the default locations fall back to built-in defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let explicit = cli_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(&path)?
            }
            None => match default_config_locations().into_iter().find(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    warn!("No config file found, using built-in defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply `ARS_CAMERA_URL`, `ARS_CLASSIFIER_URL` and `ARS_BROKER_HOST`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(CAMERA_URL_ENV_VAR) {
            info!("Camera URL overridden by {}", CAMERA_URL_ENV_VAR);
            self.camera.base_url = url;
        }
        if let Ok(url) = std::env::var(CLASSIFIER_URL_ENV_VAR) {
            info!("Classifier URL overridden by {}", CLASSIFIER_URL_ENV_VAR);
            self.classifier.base_url = url;
        }
        if let Ok(host) = std::env::var(BROKER_HOST_ENV_VAR) {
            info!("Broker host overridden by {}", BROKER_HOST_ENV_VAR);
            self.broker.host = host;
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.ambiguity.threshold_ms > MAX_THRESHOLD_MS {
            return Err(Error::Config(format!(
                "ambiguity.threshold_ms must be at most {}, got {}",
                MAX_THRESHOLD_MS, self.ambiguity.threshold_ms
            )));
        }
        if self.ambiguity.window_capacity < 2 {
            return Err(Error::Config(
                "ambiguity.window_capacity must be at least 2".to_string(),
            ));
        }
        if self.capture.number_of_frames == 0 {
            return Err(Error::Config(
                "capture.number_of_frames must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.classifier.confidence_threshold) {
            return Err(Error::Config(format!(
                "classifier.confidence_threshold must be within [0, 1], got {}",
                self.classifier.confidence_threshold
            )));
        }
        for (name, topic) in [
            ("broker.raw_topic", &self.broker.raw_topic),
            ("broker.resolved_topic", &self.broker.resolved_topic),
            ("broker.escalated_topic", &self.broker.escalated_topic),
        ] {
            if topic.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", name)));
            }
        }
        if self.broker.resolved_topic == self.broker.escalated_topic {
            return Err(Error::Config(
                "broker.resolved_topic and broker.escalated_topic must differ".to_string(),
            ));
        }
        if self.broker.inbound_queue_capacity == 0 {
            return Err(Error::Config(
                "broker.inbound_queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file locations, most specific first
pub fn default_config_locations() -> Vec<PathBuf> {
    let mut locations = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("ars").join("config.toml"));
    }
    locations.push(PathBuf::from("/etc/ars/config.toml"));
    locations
}
