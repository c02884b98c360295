//! Configuration loading and types for voxwin
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/voxwin/config.toml)
//! 3. Environment variables (VOXWIN_*)
//! 4. CLI arguments (highest priority)

use crate::error::VoxwinError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Voxwin Configuration
#
# Location: ~/.config/voxwin/config.toml
# All settings can be overridden via CLI flags

[engine]
# Path to the Vosk model directory
# Download models from https://alphacephei.com/vosk/models
model_path = "model"

# Audio input device ("default" uses system default)
# List devices with: voxwin devices
device = "default"

# Sample rate in Hz (must match what the model was trained on)
sample_rate = 16000

# Samples fed to the decoder per read
chunk_size = 4000

# Stop listening automatically after this many seconds (0 disables)
auto_stop_secs = 8

[console_output]
# Print recognition results to the terminal
enabled = true

# Show in-progress partial hypotheses (overwritten in place)
show_partial = true

# Show finalized utterances
show_final = true

[file_output]
# Append recognition results to a log file
enabled = false
path = "voxwin_results.log"

# Which results to log: "partial", "final", "complete", or "all"
target = "complete"

# Log format: "json" (one object per line) or "text"
format = "json"

[remote_inference]
# Interpret recognized speech with an OpenAI-compatible chat API
# and drive the actuator from the model's reply
enabled = false

# API key; the VOXWIN_API_KEY environment variable takes precedence
# api_key = "sk-..."

endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o-mini"

# Which results to send: "final" or "complete"
target = "final"

timeout_secs = 30
retry_count = 3

[actuator]
# Serial connection to the window actuator
enabled = true

# Serial port path, or "auto" to scan for a known USB-serial adapter
port = "auto"

baudrate = 115200
"#;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub engine: EngineConfig,

    #[serde(default)]
    pub console_output: ConsoleOutputConfig,

    #[serde(default)]
    pub file_output: FileOutputConfig,

    #[serde(default)]
    pub remote_inference: RemoteInferenceConfig,

    #[serde(default)]
    pub actuator: ActuatorConfig,
}

/// Recognition engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Path to the Vosk model directory
    #[serde(default = "default_model_path")]
    pub model_path: String,

    /// Audio input device name, or "default"
    #[serde(default = "default_device")]
    pub device: String,

    /// Sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Samples fed to the decoder per read
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Auto-stop timeout in seconds; 0 or absent-with-zero disables it
    #[serde(default = "default_auto_stop")]
    pub auto_stop_secs: Option<u64>,
}

impl EngineConfig {
    /// Effective auto-stop setting; 0 means disabled
    pub fn auto_stop(&self) -> Option<u64> {
        self.auto_stop_secs.filter(|s| *s > 0)
    }
}

/// Console sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleOutputConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Show in-progress partial hypotheses
    #[serde(default = "default_true")]
    pub show_partial: bool,

    /// Show finalized utterances
    #[serde(default = "default_true")]
    pub show_final: bool,
}

impl Default for ConsoleOutputConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_partial: true,
            show_final: true,
        }
    }
}

/// File sink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileOutputConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_path")]
    pub path: String,

    /// Which results to log: "partial", "final", "complete", or "all"
    #[serde(default = "default_complete")]
    pub target: String,

    /// "json" (one object per line) or "text"
    #[serde(default = "default_json")]
    pub format: String,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            target: default_complete(),
            format: default_json(),
        }
    }
}

/// Remote inference configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteInferenceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// API key; VOXWIN_API_KEY takes precedence when set
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Which results to send: "final" or "complete"
    #[serde(default = "default_final")]
    pub target: String,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
}

impl Default for RemoteInferenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            endpoint: default_endpoint(),
            model: default_chat_model(),
            target: default_final(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
        }
    }
}

/// Actuator transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActuatorConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Serial port path, or "auto" to scan for a known adapter
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
            baudrate: default_baudrate(),
        }
    }
}

fn default_model_path() -> String {
    "model".to_string()
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_chunk_size() -> usize {
    4000
}

fn default_auto_stop() -> Option<u64> {
    Some(8)
}

fn default_log_path() -> String {
    "voxwin_results.log".to_string()
}

fn default_complete() -> String {
    "complete".to_string()
}

fn default_final() -> String {
    "final".to_string()
}

fn default_json() -> String {
    "json".to_string()
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_chat_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_system_prompt() -> String {
    "You control a motorized window. Decide from the user's utterance whether \
     they want the window opened or closed and by how much, then reply with a \
     single JSON object of the form {\"action\": \"open\" | \"close\", \
     \"degree\": <number 0-100>}. The utterance comes from speech recognition \
     and may contain mis-heard words; when the intent is clearly a window \
     command, reinterpret near-misses accordingly. If the utterance is not a \
     window command, reply with an empty JSON object {}."
        .to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_port() -> String {
    "auto".to_string()
}

fn default_baudrate() -> u32 {
    115200
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                model_path: default_model_path(),
                device: default_device(),
                sample_rate: default_sample_rate(),
                chunk_size: default_chunk_size(),
                auto_stop_secs: default_auto_stop(),
            },
            console_output: ConsoleOutputConfig::default(),
            file_output: FileOutputConfig::default(),
            remote_inference: RemoteInferenceConfig::default(),
            actuator: ActuatorConfig::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "voxwin")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Render the effective configuration as TOML (for `voxwin config`)
    pub fn to_toml(&self) -> Result<String, VoxwinError> {
        toml::to_string_pretty(self)
            .map_err(|e| VoxwinError::Config(format!("Failed to serialize config: {}", e)))
    }
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, VoxwinError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| VoxwinError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| VoxwinError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    // Override from environment variables
    if let Ok(model_path) = std::env::var("VOXWIN_MODEL") {
        config.engine.model_path = model_path;
    }
    if let Ok(device) = std::env::var("VOXWIN_DEVICE") {
        config.engine.device = device;
    }
    if let Ok(port) = std::env::var("VOXWIN_ACTUATOR_PORT") {
        config.actuator.port = port;
    }

    Ok(config)
}
