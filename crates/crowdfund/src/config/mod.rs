use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub campaigns: CampaignConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let from_email = env::var("CROWDFUND_FROM_EMAIL")
            .unwrap_or_else(|_| CampaignConfig::DEFAULT_FROM_EMAIL.to_string());
        let public_base_url = env::var("CROWDFUND_PUBLIC_URL")
            .unwrap_or_else(|_| CampaignConfig::DEFAULT_PUBLIC_URL.to_string());
        let page_size = env::var("CROWDFUND_PAGE_SIZE")
            .unwrap_or_else(|_| CampaignConfig::DEFAULT_PAGE_SIZE.to_string())
            .parse::<usize>()
            .ok()
            .filter(|size| *size > 0)
            .ok_or(ConfigError::InvalidPageSize)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            campaigns: CampaignConfig {
                from_email,
                public_base_url: public_base_url.trim_end_matches('/').to_string(),
                page_size,
            },
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Campaign settings: outbound mail identity, public links and list paging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignConfig {
    pub from_email: String,
    pub public_base_url: String,
    pub page_size: usize,
}

impl CampaignConfig {
    pub const DEFAULT_FROM_EMAIL: &'static str = "noreply@crowdfund.local";
    pub const DEFAULT_PUBLIC_URL: &'static str = "http://127.0.0.1:3000";
    pub const DEFAULT_PAGE_SIZE: usize = 10;

    pub fn collect_url(&self, collect_id: u64) -> String {
        format!("{}/api/collects/{collect_id}/", self.public_base_url)
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            from_email: Self::DEFAULT_FROM_EMAIL.to_string(),
            public_base_url: Self::DEFAULT_PUBLIC_URL.to_string(),
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPageSize,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPageSize => {
                write!(f, "CROWDFUND_PAGE_SIZE must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPageSize => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
