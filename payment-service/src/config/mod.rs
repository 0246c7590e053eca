use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{self as core_config, ServerConfig};
use service_core::error::AppError;
use std::time::Duration;

/// Environment prefix: `PAYMENT__PROVIDER__ACCESS_TOKEN`, `PAYMENT__SERVER__PORT`, ...
pub const ENV_PREFIX: &str = "PAYMENT";

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub peers: PeersConfig,
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_db_name")]
    pub db_name: String,
}

/// QR-code provider (Mercado Pago in-store orders API).
#[derive(Deserialize, Clone, Debug)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Path template with `{seller_user_id}` and `{external_pos_id}` placeholders.
    #[serde(default = "default_qr_code_path")]
    pub qr_code_path: String,
    pub seller_user_id: String,
    pub external_pos_id: String,
    pub access_token: Secret<String>,
    /// Where the provider delivers payment notifications.
    #[serde(default)]
    pub notification_url: String,
    /// Hosts, besides the `base_url` host, that receive the access token on
    /// status queries. Notification resources point at these.
    #[serde(default = "default_trusted_hosts")]
    pub trusted_hosts: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PeersConfig {
    pub order_url: String,
    pub order_line_url: String,
    pub product_url: String,
    /// Sent as `X-Service-Name` on every peer request.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Sent as `X-Service-Key` when set.
    #[serde(default)]
    pub service_api_key: Option<Secret<String>>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct HttpClientConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl HttpClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

fn default_service_name() -> String {
    "payment-service".to_string()
}

fn default_db_name() -> String {
    "payment_db".to_string()
}

fn default_qr_code_path() -> String {
    "/instore/orders/qr/seller/collectors/{seller_user_id}/pos/{external_pos_id}/qrs".to_string()
}

fn default_trusted_hosts() -> Vec<String> {
    vec!["api.mercadolibre.com".to_string()]
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info,payment_service=debug".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        core_config::load(ENV_PREFIX)
    }
}
