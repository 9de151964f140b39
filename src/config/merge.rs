//! YAML overrides on top of the environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use super::env::parse_backend;
use super::yaml::YamlConfig;
use super::{ConfigError, ServerConfig, TlsConfig};

/// Apply every value present in `yaml` to `config`.
pub(super) fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) -> Result<(), ConfigError> {
    if let Some(server) = yaml.server {
        if let Some(host) = server.host {
            config.host = host;
        }
        if let Some(port) = server.port {
            config.port = port;
        }
        if let Some(url) = server.frontend_url {
            config.frontend_url = url;
        }
        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                _ => match (tls.cert_path, tls.key_path) {
                    (Some(cert), Some(key)) => {
                        config.tls = Some(TlsConfig {
                            cert_path: PathBuf::from(cert),
                            key_path: PathBuf::from(key),
                        });
                    }
                    (None, None) if tls.enabled.is_none() => {}
                    _ => {
                        return Err(ConfigError::Invalid(
                            "server.tls requires both cert_path and key_path".to_string(),
                        ));
                    }
                },
            }
        }
    }

    if let Some(live) = yaml.live {
        if let Some(backend) = live.backend {
            config.backend = parse_backend("live.backend", &backend)?;
        }
        if let Some(key) = live.api_key {
            config.gemini_api_key = Some(key);
        }
        if let Some(model) = live.model {
            config.gemini_model = model;
        }
        if let Some(url) = live.url {
            config.gemini_live_url = url;
        }
        if let Some(voice) = live.voice_name {
            config.session.voice_name = voice;
        }
        if let Some(language) = live.language_code {
            config.session.language_code = language;
        }
        if let Some(instructions) = live.instructions {
            config.session.instructions = Some(instructions);
        }
        if let Some(resumption) = live.session_resumption {
            config.session.session_resumption = resumption;
        }
    }

    if let Some(session) = yaml.session {
        if let Some(buffer) = session.event_buffer {
            config.session.event_buffer = buffer;
        }
        if let Some(ms) = session.write_timeout_ms {
            config.session.write_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = session.drain_timeout_ms {
            config.session.drain_timeout = Duration::from_millis(ms);
        }
        if let Some(error_frames) = session.error_frames {
            config.session.error_frames = error_frames;
        }
    }

    if let Some(security) = yaml.security {
        if let Some(origins) = security.cors_allowed_origins {
            config.cors_allowed_origins = Some(origins);
        }
        if let Some(rps) = security.rate_limit_requests_per_second {
            config.rate_limit_requests_per_second = rps;
        }
        if let Some(burst) = security.rate_limit_burst_size {
            config.rate_limit_burst_size = burst;
        }
        if let Some(max) = security.max_websocket_connections {
            config.max_websocket_connections = Some(max);
        }
        if let Some(per_ip) = security.max_connections_per_ip {
            config.max_connections_per_ip = per_ip;
        }
    }

    Ok(())
}
