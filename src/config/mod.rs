use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub csrf: CsrfConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self> {
        let configured_path = std::env::var("DONATION_API_CONFIG")
            .unwrap_or_else(|_| "config/api.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("DONATION_API_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/api.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, &configured_path))?;
        let config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize API configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        assert!(
            !self.database.url.is_empty(),
            "Database URL must be specified"
        );
        assert!(
            self.server.port > 0,
            "Server port must be greater than zero"
        );
        self.cors.ensure_bounds()?;
        self.csrf.ensure_bounds()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        assert!(self.port < 65535, "HTTP port must be below 65535");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: Option<u32>,
}

/// Browser origins allowed to call the API with credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    fn ensure_bounds(&self) -> Result<()> {
        assert!(
            !self.allowed_origins.is_empty(),
            "At least one CORS origin must be configured"
        );
        assert!(
            self.allowed_origins.len() <= 32,
            "CORS origin list exceeds defensive limit"
        );
        for origin in &self.allowed_origins {
            assert!(!origin.is_empty(), "CORS origin cannot be empty");
            assert!(
                origin.starts_with("http://") || origin.starts_with("https://"),
                "CORS origin must be an http(s) URL"
            );
            assert!(
                origin.len() <= 256,
                "CORS origin length exceeds defensive limit"
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CsrfConfig {
    pub secret: String,
    #[serde(default = "CsrfConfig::default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    #[serde(default = "CsrfConfig::default_enabled")]
    pub enabled: bool,
}

impl CsrfConfig {
    fn ensure_bounds(&self) -> Result<()> {
        if self.enabled {
            assert!(
                self.secret.len() >= crate::csrf::MIN_SECRET_LEN,
                "CSRF secret must be at least 32 bytes"
            );
        }
        assert!(
            self.token_ttl_seconds >= 60,
            "CSRF token TTL must be at least 60 seconds"
        );
        assert!(
            self.token_ttl_seconds <= 3_600,
            "CSRF token TTL cannot exceed one hour"
        );
        Ok(())
    }

    const fn default_token_ttl_seconds() -> u64 {
        900
    }

    const fn default_enabled() -> bool {
        true
    }
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}
