//! Environment variable loading.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{ConfigError, ServerConfig, SessionConfig, TlsConfig};
use crate::core::live::{LiveBackendKind, get_supported_live_backends};

/// Read a variable, treating blank values as unset.
pub(super) fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable with `FromStr`.
pub(super) fn parse_env<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    env_var(key)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}

/// Parse a boolean variable: `true`/`false`, `1`/`0`, `yes`/`no`.
pub(super) fn parse_bool_env(key: &'static str) -> Result<Option<bool>, ConfigError> {
    env_var(key)
        .map(|value| parse_bool(&value).ok_or(ConfigError::InvalidValue { key, value }))
        .transpose()
}

pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(super) fn parse_backend(key: &'static str, value: &str) -> Result<LiveBackendKind, ConfigError> {
    LiveBackendKind::parse(value).ok_or_else(|| ConfigError::UnknownBackend {
        key,
        value: value.to_string(),
        supported: get_supported_live_backends().join(", "),
    })
}

/// Build a configuration from environment variables and defaults.
pub(super) fn load_from_env() -> Result<ServerConfig, ConfigError> {
    let mut config = ServerConfig::default();

    if let Some(host) = env_var("HOST") {
        config.host = host;
    }
    if let Some(port) = parse_env("PORT")? {
        config.port = port;
    }

    config.tls = match (env_var("TLS_CERT_PATH"), env_var("TLS_KEY_PATH")) {
        (Some(cert), Some(key)) => Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        }),
        (None, None) => None,
        _ => {
            return Err(ConfigError::Invalid(
                "TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string(),
            ));
        }
    };

    if let Some(url) = env_var("FRONTEND_URL") {
        config.frontend_url = url;
    }

    if let Some(backend) = env_var("LIVE_BACKEND") {
        config.backend = parse_backend("LIVE_BACKEND", &backend)?;
    }
    config.gemini_api_key = env_var("GEMINI_API_KEY").or_else(|| env_var("GOOGLE_API_KEY"));
    if let Some(model) = env_var("GEMINI_MODEL") {
        config.gemini_model = model;
    }
    if let Some(url) = env_var("GEMINI_LIVE_URL") {
        config.gemini_live_url = url;
    }

    config.session = load_session_from_env()?;

    config.cors_allowed_origins = env_var("CORS_ALLOWED_ORIGINS");
    if let Some(rps) = parse_env("RATE_LIMIT_REQUESTS_PER_SECOND")? {
        config.rate_limit_requests_per_second = rps;
    }
    if let Some(burst) = parse_env("RATE_LIMIT_BURST_SIZE")? {
        config.rate_limit_burst_size = burst;
    }
    config.max_websocket_connections = parse_env("MAX_WEBSOCKET_CONNECTIONS")?;
    if let Some(per_ip) = parse_env("MAX_CONNECTIONS_PER_IP")? {
        config.max_connections_per_ip = per_ip;
    }

    Ok(config)
}

fn load_session_from_env() -> Result<SessionConfig, ConfigError> {
    let mut session = SessionConfig::default();

    if let Some(voice) = env_var("LIVE_VOICE_NAME") {
        session.voice_name = voice;
    }
    if let Some(language) = env_var("LIVE_LANGUAGE_CODE") {
        session.language_code = language;
    }
    session.instructions = env_var("LIVE_INSTRUCTIONS");
    if let Some(resumption) = parse_bool_env("LIVE_SESSION_RESUMPTION")? {
        session.session_resumption = resumption;
    }
    if let Some(buffer) = parse_env("SESSION_EVENT_BUFFER")? {
        session.event_buffer = buffer;
    }
    if let Some(ms) = parse_env::<u64>("SESSION_WRITE_TIMEOUT_MS")? {
        session.write_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = parse_env::<u64>("SESSION_DRAIN_TIMEOUT_MS")? {
        session.drain_timeout = Duration::from_millis(ms);
    }
    if let Some(error_frames) = parse_bool_env("SESSION_ERROR_FRAMES")? {
        session.error_frames = error_frames;
    }

    Ok(session)
}
