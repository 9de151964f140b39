//! Configuration validation.

use super::{ConfigError, ServerConfig};
use crate::core::live::LiveBackendKind;

/// Validate a fully merged configuration.
pub(super) fn validate(config: &ServerConfig) -> Result<(), ConfigError> {
    validate_backend(config)?;
    validate_urls(config)?;
    validate_tls(config)?;
    validate_limits(config)?;
    Ok(())
}

fn validate_backend(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.backend == LiveBackendKind::Gemini
        && config.gemini_api_key.as_deref().is_none_or(str::is_empty)
    {
        return Err(ConfigError::MissingApiKey(
            "GEMINI_API_KEY (or GOOGLE_API_KEY) is required for the gemini backend; \
             set LIVE_BACKEND=loopback to run without credentials"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_urls(config: &ServerConfig) -> Result<(), ConfigError> {
    let live_url = url::Url::parse(&config.gemini_live_url).map_err(|e| {
        ConfigError::Invalid(format!(
            "Gemini Live URL '{}' is invalid: {e}",
            config.gemini_live_url
        ))
    })?;
    if !matches!(live_url.scheme(), "ws" | "wss") {
        return Err(ConfigError::Invalid(format!(
            "Gemini Live URL must use ws:// or wss://, got '{}'",
            config.gemini_live_url
        )));
    }

    url::Url::parse(&config.frontend_url).map_err(|e| {
        ConfigError::Invalid(format!(
            "Frontend URL '{}' is invalid: {e}",
            config.frontend_url
        ))
    })?;

    Ok(())
}

fn validate_tls(config: &ServerConfig) -> Result<(), ConfigError> {
    let Some(tls) = &config.tls else {
        return Ok(());
    };
    for (label, path) in [("certificate", &tls.cert_path), ("private key", &tls.key_path)] {
        if !path.exists() {
            return Err(ConfigError::Invalid(format!(
                "TLS {label} file not found: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

fn validate_limits(config: &ServerConfig) -> Result<(), ConfigError> {
    if config.rate_limit_requests_per_second == 0 || config.rate_limit_burst_size == 0 {
        return Err(ConfigError::Invalid(
            "Rate limit values must be greater than zero".to_string(),
        ));
    }
    if config.max_connections_per_ip == 0 || config.max_websocket_connections == Some(0) {
        return Err(ConfigError::Invalid(
            "Connection limits must be greater than zero".to_string(),
        ));
    }
    if config.session.event_buffer == 0 {
        return Err(ConfigError::Invalid(
            "Session event buffer must be greater than zero".to_string(),
        ));
    }
    if config.session.write_timeout.is_zero() {
        return Err(ConfigError::Invalid(
            "Session write timeout must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
