//! Service configuration loaded from the environment
//!
//! Every setting has a default except the model provider key and, for the
//! Postgres backend, the connection string. [`AppConfig::from_lookup`] takes
//! any key lookup so tests never have to touch process environment.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::agent::AgentConfig;
use crate::llm::LlmConfig;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "openrouter/auto";
pub const DEFAULT_ORIGINS: &str = "http://localhost:3000";

/// Errors raised while reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Which todo store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// CORS allow-list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Origins allowed to call the API with credentials
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: split_list(DEFAULT_ORIGINS),
        }
    }
}

impl CorsConfig {
    /// Convert to a tower-http CorsLayer
    ///
    /// Any method and header is accepted from an allowed origin. Wildcards are
    /// not permitted alongside credentials, so the request's own method and
    /// headers are mirrored back instead.
    pub fn to_layer(&self) -> CorsLayer {
        let mut valid = Vec::new();
        for origin in &self.allowed_origins {
            match origin.parse::<axum::http::HeaderValue>() {
                Ok(value) => valid.push(value),
                Err(_) => tracing::warn!("CORS: invalid origin '{}' - skipping", origin),
            }
        }

        if valid.is_empty() {
            tracing::warn!("CORS: no valid origins configured, cross-origin requests are rejected");
        }

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(valid))
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
            .allow_credentials(true)
    }
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::Invalid {
            key: "TODO_AGENT_HOST",
            value: addr,
        })
    }
}

/// Todo store settings
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Create the `todos` table at startup if it does not exist
    pub auto_schema: bool,
}

/// Logging and trace export settings
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub otlp_endpoint: Option<String>,
    pub json_logs: bool,
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend = match get("TODO_AGENT_STORE").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "TODO_AGENT_STORE",
                    value: other.to_string(),
                })
            }
        };

        let database_url = get("DATABASE_URL").or_else(|| get("NEON_CONNECTION_STRING"));
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let api_key =
            get("OPENROUTER_API_KEY").ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;

        let store = StoreConfig {
            backend,
            database_url,
            max_connections: parse_or(
                get("TODO_AGENT_DB_MAX_CONNECTIONS"),
                "TODO_AGENT_DB_MAX_CONNECTIONS",
                5,
            )?,
            auto_schema: parse_flag(get("TODO_AGENT_AUTO_SCHEMA")),
        };

        let llm = LlmConfig {
            base_url: get("OPENROUTER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            model: get("TODO_AGENT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: Some(parse_or(
                get("TODO_AGENT_MAX_TOKENS"),
                "TODO_AGENT_MAX_TOKENS",
                4000,
            )?),
            temperature: None,
        };

        let agent = AgentConfig {
            max_iterations: parse_or(
                get("TODO_AGENT_MAX_ITERATIONS"),
                "TODO_AGENT_MAX_ITERATIONS",
                AgentConfig::default().max_iterations,
            )?,
        };

        let server = ServerConfig {
            host: get("TODO_AGENT_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("TODO_AGENT_PORT"), "TODO_AGENT_PORT", 8000)?,
            cors: get("TODO_AGENT_CORS_ORIGINS")
                .map(|origins| CorsConfig {
                    allowed_origins: split_list(&origins),
                })
                .unwrap_or_default(),
        };

        let telemetry = TelemetryConfig {
            otlp_endpoint: get("OTEL_EXPORTER_OTLP_ENDPOINT"),
            json_logs: parse_flag(get("TODO_AGENT_LOG_JSON")),
        };

        Ok(Self {
            server,
            store,
            llm,
            agent,
            telemetry,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/todos"),
            ("OPENROUTER_API_KEY", "sk-test"),
        ]))
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Postgres);
        assert_eq!(config.store.max_connections, 5);
        assert!(!config.store.auto_schema);
        assert_eq!(config.llm.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert_eq!(config.llm.max_tokens, Some(4000));
        assert_eq!(config.agent.max_iterations, 10);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.cors.allowed_origins, vec!["http://localhost:3000"]);
        assert!(config.telemetry.otlp_endpoint.is_none());
    }

    #[test]
    fn test_neon_connection_string_fallback() {
        let config = AppConfig::from_lookup(lookup(&[
            ("NEON_CONNECTION_STRING", "postgres://neon/db"),
            ("OPENROUTER_API_KEY", "sk-test"),
        ]))
        .unwrap();
        assert_eq!(config.store.database_url.as_deref(), Some("postgres://neon/db"));
    }

    #[test]
    fn test_postgres_requires_url() {
        let err = AppConfig::from_lookup(lookup(&[("OPENROUTER_API_KEY", "sk-test")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn test_memory_backend_needs_no_url() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TODO_AGENT_STORE", "memory"),
            ("OPENROUTER_API_KEY", "sk-test"),
        ]))
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_api_key_required() {
        let err = AppConfig::from_lookup(lookup(&[("TODO_AGENT_STORE", "memory")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENROUTER_API_KEY"));
    }

    #[test]
    fn test_invalid_number() {
        let err = AppConfig::from_lookup(lookup(&[
            ("TODO_AGENT_STORE", "memory"),
            ("OPENROUTER_API_KEY", "sk-test"),
            ("TODO_AGENT_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "TODO_AGENT_PORT",
                value: "eighty".into()
            }
        );
    }

    #[test]
    fn test_cors_origins_are_split() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TODO_AGENT_STORE", "memory"),
            ("OPENROUTER_API_KEY", "sk-test"),
            ("TODO_AGENT_CORS_ORIGINS", "http://localhost:3000, https://app.example.com,"),
        ]))
        .unwrap();
        assert_eq!(
            config.server.cors.allowed_origins,
            vec!["http://localhost:3000", "https://app.example.com"]
        );
        let _layer = config.server.cors.to_layer();
    }

    #[test]
    fn test_bind_addr() {
        let server = ServerConfig {
            host: "127.0.0.1".into(),
            port: 8000,
            cors: CorsConfig::default(),
        };
        assert_eq!(server.bind_addr().unwrap().port(), 8000);
    }

    #[test]
    fn test_flags() {
        assert!(parse_flag(Some("TRUE".into())));
        assert!(parse_flag(Some("1".into())));
        assert!(!parse_flag(Some("off".into())));
        assert!(!parse_flag(None));
    }
}
