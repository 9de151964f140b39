//! Configuration module for the live voice gateway
//!
//! This module handles server configuration from various sources: .env files, YAML files,
//! and environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//! - `merge`: Applying YAML overrides on top of the environment
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use live_voice_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::live::gemini::{DEFAULT_GEMINI_MODEL, GEMINI_LIVE_URL, GeminiLiveConfig};
use crate::core::live::{
    DEFAULT_EVENT_BUFFER, DEFAULT_LANGUAGE_CODE, DEFAULT_VOICE_NAME, LiveBackendKind, Modality,
    RunConfig, SpeechConfig,
};
use crate::handlers::live::{DEFAULT_DRAIN_TIMEOUT, DEFAULT_WRITE_TIMEOUT, SessionSettings};

mod env;
mod merge;
mod validation;
mod yaml;

pub use yaml::YamlConfig;

/// Default target of the `GET /` redirect
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:8080";

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown backend for {key}: {value:?} (supported: {supported})")]
    UnknownBackend {
        key: &'static str,
        value: String,
        supported: String,
    },

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Defaults applied to every live session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Prebuilt voice used for spoken responses
    pub voice_name: String,
    /// BCP-47 language code of the conversation
    pub language_code: String,
    /// Optional system instructions sent to the backend
    pub instructions: Option<String>,
    /// Ask the backend for session resumption handles
    pub session_resumption: bool,
    /// Capacity of the backend event channel
    pub event_buffer: usize,
    /// Bound on a single client write
    pub write_timeout: Duration,
    /// Grace period for the losing pump during teardown
    pub drain_timeout: Duration,
    /// Send an error frame before closing on failures
    pub error_frames: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            voice_name: DEFAULT_VOICE_NAME.to_string(),
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
            instructions: None,
            session_resumption: false,
            event_buffer: DEFAULT_EVENT_BUFFER,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            error_frames: false,
        }
    }
}

impl SessionConfig {
    /// Build the run configuration for one connection.
    pub fn run_config(&self, modality: Modality) -> RunConfig {
        let speech = SpeechConfig {
            voice_name: self.voice_name.clone(),
            language_code: self.language_code.clone(),
        };
        let mut run_config = RunConfig::new(modality, speech);
        run_config.session_resumption = self.session_resumption;
        run_config.instructions = self.instructions.clone();
        run_config
    }

    /// Coordinator settings derived from this configuration.
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            event_buffer: self.event_buffer,
            write_timeout: self.write_timeout,
            drain_timeout: self.drain_timeout,
            error_frames: self.error_frames,
        }
    }
}

/// Server configuration
///
/// Contains all configuration needed to run the gateway:
/// - Server settings (host, port, TLS, frontend redirect)
/// - Live backend selection and Gemini credentials
/// - Per-session defaults
/// - Security settings (CORS, rate limiting, connection limits)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Target of the `GET /` redirect
    pub frontend_url: String,

    // Live backend
    pub backend: LiveBackendKind,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_live_url: String,

    // Session defaults
    pub session: SessionConfig,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,

    // Rate limiting configuration
    /// Maximum requests per second per IP address
    /// Default: 60
    pub rate_limit_requests_per_second: u32,
    /// Maximum burst size for rate limiting
    /// Default: 10
    pub rate_limit_burst_size: u32,

    // Connection limits
    /// Maximum concurrent WebSocket connections
    /// Default: None (unlimited)
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    /// Default: 100
    pub max_connections_per_ip: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            tls: None,
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            backend: LiveBackendKind::default(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_live_url: GEMINI_LIVE_URL.to_string(),
            session: SessionConfig::default(),
            cors_allowed_origins: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_websocket_connections: None,
            max_connections_per_ip: 100,
        }
    }
}

/// Zeroize the API key when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.gemini_api_key {
            key.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// The `.env` file is loaded in `main` before this is called.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = env::load_from_env()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// After loading and merging, performs validation on the final configuration.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;
        let mut config = env::load_from_env()?;
        merge::apply_yaml(&mut config, yaml_config)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Gemini backend configuration, if an API key is present.
    pub fn gemini_config(&self) -> Option<GeminiLiveConfig> {
        self.gemini_api_key.as_ref().map(|key| {
            GeminiLiveConfig::new(key.as_str())
                .with_model(self.gemini_model.as_str())
                .with_url(self.gemini_live_url.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_KEYS: &[&str] = &[
        "HOST",
        "PORT",
        "TLS_CERT_PATH",
        "TLS_KEY_PATH",
        "FRONTEND_URL",
        "LIVE_BACKEND",
        "GEMINI_API_KEY",
        "GOOGLE_API_KEY",
        "GEMINI_MODEL",
        "GEMINI_LIVE_URL",
        "LIVE_VOICE_NAME",
        "LIVE_LANGUAGE_CODE",
        "LIVE_INSTRUCTIONS",
        "LIVE_SESSION_RESUMPTION",
        "SESSION_EVENT_BUFFER",
        "SESSION_WRITE_TIMEOUT_MS",
        "SESSION_DRAIN_TIMEOUT_MS",
        "SESSION_ERROR_FRAMES",
        "CORS_ALLOWED_ORIGINS",
        "RATE_LIMIT_REQUESTS_PER_SECOND",
        "RATE_LIMIT_BURST_SIZE",
        "MAX_WEBSOCKET_CONNECTIONS",
        "MAX_CONNECTIONS_PER_IP",
    ];

    // Helper to clean up environment variables
    fn cleanup_env_vars() {
        unsafe {
            for key in ENV_KEYS {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:8000");
        assert!(!config.is_tls_enabled());
        assert_eq!(config.frontend_url, "http://localhost:8080");
        assert_eq!(config.backend, LiveBackendKind::Gemini);
        assert_eq!(config.rate_limit_requests_per_second, 60);
        assert_eq!(config.rate_limit_burst_size, 10);
        assert_eq!(config.max_connections_per_ip, 100);
        assert!(config.gemini_config().is_none());
    }

    #[test]
    fn test_session_run_config() {
        let mut session = SessionConfig::default();
        session.instructions = Some("Be brief.".to_string());

        let run_config = session.run_config(Modality::Audio);
        assert!(run_config.is_audio());
        assert_eq!(run_config.speech.voice_name, "Charon");
        assert_eq!(run_config.speech.language_code, "de-DE");
        assert!(run_config.input_audio_transcription);
        assert!(run_config.output_audio_transcription);
        assert_eq!(run_config.instructions.as_deref(), Some("Be brief."));

        let text = session.run_config(Modality::Text);
        assert_eq!(text.response_modalities, vec![Modality::Text]);
    }

    #[test]
    fn test_session_settings() {
        let settings = SessionConfig::default().settings();
        assert_eq!(settings.event_buffer, 256);
        assert_eq!(settings.write_timeout, Duration::from_secs(10));
        assert_eq!(settings.drain_timeout, Duration::from_secs(2));
        assert!(!settings.error_frames);
    }

    #[test]
    fn test_gemini_config_from_server_config() {
        let mut config = ServerConfig::default();
        config.gemini_api_key = Some("gm-key".to_string());
        config.gemini_model = "custom-model".to_string();

        let gemini = config.gemini_config().unwrap();
        assert_eq!(gemini.model_resource(), "models/custom-model");
        assert!(
            gemini
                .ws_url()
                .unwrap()
                .as_str()
                .ends_with("BidiGenerateContent?key=gm-key")
        );
    }

    #[test]
    #[serial]
    fn test_from_env_loopback() {
        cleanup_env_vars();
        unsafe {
            env::set_var("LIVE_BACKEND", "loopback");
            env::set_var("PORT", "9100");
            env::set_var("SESSION_ERROR_FRAMES", "true");
            env::set_var("SESSION_WRITE_TIMEOUT_MS", "250");
            env::set_var("MAX_WEBSOCKET_CONNECTIONS", "12");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.backend, LiveBackendKind::Loopback);
        assert_eq!(config.port, 9100);
        assert!(config.session.error_frames);
        assert_eq!(config.session.write_timeout, Duration::from_millis(250));
        assert_eq!(config.max_websocket_connections, Some(12));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_google_api_key_fallback() {
        cleanup_env_vars();
        unsafe {
            env::set_var("GOOGLE_API_KEY", "google-key");
        }

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.backend, LiveBackendKind::Gemini);
        assert_eq!(config.gemini_api_key.as_deref(), Some("google-key"));

        unsafe {
            env::set_var("GEMINI_API_KEY", "gemini-key");
        }
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.gemini_api_key.as_deref(), Some("gemini-key"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_gemini_without_key_fails() {
        cleanup_env_vars();

        let result = ServerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::MissingApiKey(_))));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_values() {
        cleanup_env_vars();
        unsafe {
            env::set_var("LIVE_BACKEND", "loopback");
            env::set_var("PORT", "not-a-port");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::InvalidValue { key: "PORT", .. })
        ));

        unsafe {
            env::set_var("PORT", "8000");
            env::set_var("SESSION_ERROR_FRAMES", "sometimes");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::InvalidValue {
                key: "SESSION_ERROR_FRAMES",
                ..
            })
        ));

        unsafe {
            env::remove_var("SESSION_ERROR_FRAMES");
            env::set_var("TLS_CERT_PATH", "/certs/server.crt");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::Invalid(_))
        ));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let yaml_content = r#"
server:
  host: "127.0.0.1"
  frontend_url: "https://app.example.com"

live:
  backend: "loopback"
  voice_name: "Puck"

session:
  drain_timeout_ms: 750
"#;
        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("HOST", "0.0.0.0");
            env::set_var("PORT", "9200");
            env::set_var("LIVE_VOICE_NAME", "Kore");
        }

        let config = ServerConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.session.voice_name, "Puck");
        assert_eq!(config.backend, LiveBackendKind::Loopback);
        assert_eq!(config.frontend_url, "https://app.example.com");
        assert_eq!(config.session.drain_timeout, Duration::from_millis(750));
        // ENV value kept where YAML is silent
        assert_eq!(config.port, 9200);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let config_path = PathBuf::from("/nonexistent/config.yaml");
        let result = ServerConfig::from_file(&config_path);

        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = ServerConfig::from_file(&config_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_tls() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let cert_path = temp_dir.path().join("server.crt");
        let key_path = temp_dir.path().join("server.key");
        fs::write(&cert_path, "cert").unwrap();
        fs::write(&key_path, "key").unwrap();

        let config_path = temp_dir.path().join("config.yaml");
        let yaml_content = format!(
            r#"
server:
  tls:
    enabled: true
    cert_path: "{}"
    key_path: "{}"
live:
  backend: "loopback"
"#,
            cert_path.display(),
            key_path.display()
        );
        fs::write(&config_path, yaml_content).unwrap();

        let config = ServerConfig::from_file(&config_path).unwrap();
        assert!(config.is_tls_enabled());
        let tls = config.tls.as_ref().unwrap();
        assert_eq!(tls.cert_path, cert_path);
        assert_eq!(tls.key_path, key_path);

        cleanup_env_vars();
    }
}
