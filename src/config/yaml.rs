use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 8000
///   frontend_url: "http://localhost:8080"
///   tls:
///     enabled: true
///     cert_path: "/etc/certs/server.crt"
///     key_path: "/etc/certs/server.key"
///
/// live:
///   backend: "gemini"
///   api_key: "your-gemini-key"
///   model: "gemini-2.5-flash-native-audio-latest"
///   voice_name: "Charon"
///   language_code: "de-DE"
///   instructions: "You are a friendly assistant."
///   session_resumption: false
///
/// session:
///   event_buffer: 256
///   write_timeout_ms: 10000
///   drain_timeout_ms: 2000
///   error_frames: false
///
/// security:
///   cors_allowed_origins: "*"
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   max_websocket_connections: 1000
///   max_connections_per_ip: 100
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub live: Option<LiveYaml>,
    pub session: Option<SessionYaml>,
    pub security: Option<SecurityYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Target of the `GET /` redirect
    pub frontend_url: Option<String>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub enabled: Option<bool>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Live backend configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LiveYaml {
    /// `gemini` or `loopback`
    pub backend: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub url: Option<String>,
    pub voice_name: Option<String>,
    pub language_code: Option<String>,
    pub instructions: Option<String>,
    pub session_resumption: Option<bool>,
}

/// Per-connection session tuning from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub event_buffer: Option<usize>,
    pub write_timeout_ms: Option<u64>,
    pub drain_timeout_ms: Option<u64>,
    pub error_frames: Option<bool>,
}

/// Security configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    /// CORS allowed origins (comma-separated list or "*" for all)
    pub cors_allowed_origins: Option<String>,
    /// Maximum requests per second per IP address
    pub rate_limit_requests_per_second: Option<u32>,
    /// Maximum burst size for rate limiting
    pub rate_limit_burst_size: Option<u32>,
    /// Maximum concurrent WebSocket connections
    pub max_websocket_connections: Option<usize>,
    /// Maximum connections per IP address
    pub max_connections_per_ip: Option<u32>,
}

impl YamlConfig {
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
