//! Server configuration from flags and environment

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use clap::Parser;
use tower_http::cors::CorsLayer;

/// ECDH exchange server
#[derive(Debug, Clone, Parser)]
#[command(name = "exchange-server", version, about)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "EXCHANGE_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "EXCHANGE_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Origin allowed by CORS; `*` allows any origin
    #[arg(long, env = "EXCHANGE_ALLOWED_ORIGIN", default_value = "http://localhost:5173")]
    pub allowed_origin: String,

    /// Maximum number of concurrently stored HTTP sessions
    #[arg(long, env = "EXCHANGE_MAX_SESSIONS", default_value_t = 1024)]
    pub max_sessions: usize,

    /// Seconds an HTTP session may sit unused before it is dropped
    #[arg(long = "session-ttl", env = "EXCHANGE_SESSION_TTL", default_value_t = 300)]
    pub session_ttl_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn cors_layer(&self) -> anyhow::Result<CorsLayer> {
        if self.allowed_origin == "*" {
            return Ok(CorsLayer::permissive());
        }

        let origin: HeaderValue = self
            .allowed_origin
            .parse()
            .with_context(|| format!("invalid allowed origin {:?}", self.allowed_origin))?;

        Ok(CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["exchange-server"]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.allowed_origin, "http://localhost:5173");
        assert_eq!(config.session_ttl(), Duration::from_secs(300));
        assert!(config.cors_layer().is_ok());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = ServerConfig::try_parse_from([
            "exchange-server",
            "--host",
            "127.0.0.1",
            "--port",
            "8443",
            "--allowed-origin",
            "*",
            "--max-sessions",
            "2",
            "--session-ttl",
            "30",
        ])
        .unwrap();
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:8443");
        assert_eq!(config.max_sessions, 2);
        assert_eq!(config.session_ttl(), Duration::from_secs(30));
        assert!(config.cors_layer().is_ok());
    }

    #[test]
    fn test_rejects_unparseable_origin() {
        let config = ServerConfig::try_parse_from([
            "exchange-server",
            "--allowed-origin",
            "bad\norigin",
        ])
        .unwrap();
        assert!(config.cors_layer().is_err());
    }
}
