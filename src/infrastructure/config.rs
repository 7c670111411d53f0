use crate::dos::repository::DatabaseSettings;
use crate::infrastructure::logging::parse_log_level;
use crate::shared::constants::{aws, change_request, dos};
use crate::shared::error::DosIntegrationError;
use config::{Config as ConfigSource, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Runtime configuration.
///
/// Endpoint, database and gateway credentials have no defaults; leaving
/// them unset fails `validate`. Keys mirror the deployment environment variables (`DB_SERVER`,
/// `MOCK_MODE`, `CHANGE_REQUEST_ENDPOINT_URL`, ...) in lower case, so the
/// same names work in a TOML file and in the process environment.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_gateway_username: String,
    pub api_gateway_password: String,
    pub change_request_endpoint_url: String,
    pub change_request_endpoint_timeout: u64,
    pub log_level: String,
    pub mock_mode: bool,
    pub mockserver_url: String,
    pub db_server: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user_name: String,
    pub db_secret_name: String,
    /// Skips Secrets Manager when set, for local databases
    pub db_password: Option<String>,
    pub event_receiver_function_url: Option<String>,
    pub event_sender_function_url: Option<String>,
    pub aws_region: String,
    pub aws_profile: Option<String>,
    pub http_host: String,
    pub http_port: u16,
    pub metrics_enabled: bool,
    pub metrics_host: String,
    pub metrics_port: u16,
}

/// Where and how change requests are delivered
#[derive(Clone)]
pub struct ChangeRequestSettings {
    pub endpoint_url: String,
    pub timeout_secs: u64,
    pub username: String,
    pub password: String,
    pub mock_mode: bool,
    pub mockserver_url: String,
}

impl ChangeRequestSettings {
    /// The mock server when mock mode is on, otherwise the live endpoint
    pub fn target_url(&self) -> &str {
        if self.mock_mode {
            &self.mockserver_url
        } else {
            &self.endpoint_url
        }
    }
}

impl fmt::Debug for ChangeRequestSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRequestSettings")
            .field("endpoint_url", &self.endpoint_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("username", &self.username)
            .field("password", &"********")
            .field("mock_mode", &self.mock_mode)
            .field("mockserver_url", &self.mockserver_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn load() -> Result<Self, DosIntegrationError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from(Path::new(&config_path), Environment::default())
    }

    /// Layers `config/default.toml`, the given file and `environment`, later sources winning
    pub fn load_from(config_path: &Path, environment: Environment) -> Result<Self, DosIntegrationError> {
        info!("Loading configuration from: {}", config_path.display());

        let config = ConfigSource::builder()
            .add_source(File::from(Path::new("config/default.toml")).required(false))
            .add_source(File::from(config_path).required(false))
            .add_source(environment.ignore_empty(true))
            .build()?;

        let config: Config = config.try_deserialize()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.mock_mode {
            if self.mockserver_url.is_empty() {
                return Err("MOCKSERVER_URL cannot be empty in mock mode".to_string());
            }
        } else {
            if self.change_request_endpoint_url.is_empty() {
                return Err("CHANGE_REQUEST_ENDPOINT_URL cannot be empty".to_string());
            }
            if self.api_gateway_username.is_empty() {
                return Err("API_GATEWAY_USERNAME cannot be empty".to_string());
            }
        }

        if self.change_request_endpoint_timeout == 0 {
            return Err("CHANGE_REQUEST_ENDPOINT_TIMEOUT must be greater than 0".to_string());
        }

        let required = [
            ("DB_SERVER", &self.db_server),
            ("DB_NAME", &self.db_name),
            ("DB_USER_NAME", &self.db_user_name),
            ("DB_SECRET_NAME", &self.db_secret_name),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(format!("{} cannot be empty", name));
            }
        }

        parse_log_level(&self.log_level)?;

        Ok(())
    }

    pub fn database(&self) -> DatabaseSettings {
        DatabaseSettings {
            server: self.db_server.clone(),
            port: self.db_port,
            name: self.db_name.clone(),
            user_name: self.db_user_name.clone(),
            secret_name: self.db_secret_name.clone(),
        }
    }

    pub fn change_request(&self) -> ChangeRequestSettings {
        ChangeRequestSettings {
            endpoint_url: self.change_request_endpoint_url.clone(),
            timeout_secs: self.change_request_endpoint_timeout,
            username: self.api_gateway_username.clone(),
            password: self.api_gateway_password.clone(),
            mock_mode: self.mock_mode,
            mockserver_url: self.mockserver_url.clone(),
        }
    }

    pub fn metrics(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.metrics_enabled,
            host: self.metrics_host.clone(),
            port: self.metrics_port,
        }
    }

    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("change_request", &self.change_request())
            .field("log_level", &self.log_level)
            .field("database", &self.database())
            .field("db_password", &self.db_password.as_ref().map(|_| "********"))
            .field("event_receiver_function_url", &self.event_receiver_function_url)
            .field("event_sender_function_url", &self.event_sender_function_url)
            .field("aws_region", &self.aws_region)
            .field("aws_profile", &self.aws_profile)
            .field("http_address", &self.http_address())
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_gateway_username: String::new(),
            api_gateway_password: String::new(),
            change_request_endpoint_url: String::new(),
            change_request_endpoint_timeout: change_request::DEFAULT_TIMEOUT_SECS,
            log_level: "INFO".to_string(),
            mock_mode: false,
            mockserver_url: String::new(),
            db_server: String::new(),
            db_port: dos::DEFAULT_PORT,
            db_name: String::new(),
            db_user_name: String::new(),
            db_secret_name: String::new(),
            db_password: None,
            event_receiver_function_url: None,
            event_sender_function_url: None,
            aws_region: aws::DEFAULT_REGION.to_string(),
            aws_profile: None,
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            metrics_enabled: true,
            metrics_host: "127.0.0.1".to_string(),
            metrics_port: 9090,
        }
    }
}
