use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub kie: KieConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    /// API limits
    #[serde(default)]
    pub api: ApiLimits,
}

/// API request limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiLimits {
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
    #[serde(default = "default_max_styles_per_request")]
    pub max_styles_per_request: usize,
    #[serde(default = "default_max_detail_chars")]
    pub max_detail_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            ledger_path: default_ledger_path(),
            api: ApiLimits::default(),
        }
    }
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            max_styles_per_request: default_max_styles_per_request(),
            max_detail_chars: default_max_detail_chars(),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    "0.0.0.0:8080".parse().unwrap()
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("data/ledger")
}

fn default_max_payload_bytes() -> usize {
    256 * 1024 // 256 KB
}

fn default_max_styles_per_request() -> usize {
    6
}

fn default_max_detail_chars() -> usize {
    500
}

/// Storage provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    S3,
    Local,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    pub endpoint: Option<String>,
    /// S3 access key (loaded from environment, not from config file)
    #[serde(skip)]
    pub access_key: Option<String>,
    /// S3 secret key (loaded from environment, not from config file)
    #[serde(skip)]
    pub secret_key: Option<String>,
    pub region: Option<String>,
    /// Root directory for the `local` provider
    #[serde(default = "default_local_path")]
    pub local_path: PathBuf,
    /// Public base URL assets are served from
    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Local,
            bucket: default_bucket(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            region: None,
            local_path: default_local_path(),
            cdn_url: default_cdn_url(),
        }
    }
}

impl Default for StorageProvider {
    fn default() -> Self {
        StorageProvider::Local
    }
}

fn default_bucket() -> String {
    "salon-assets".to_string()
}

fn default_local_path() -> PathBuf {
    PathBuf::from("data/objects")
}

fn default_cdn_url() -> String {
    "http://localhost:9000/salon-assets".to_string()
}

/// KIE provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KieConfig {
    #[serde(default = "default_kie_base_url")]
    pub base_url: String,
    /// API key (loaded from environment, not from config file)
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Public URL the provider notifies on completion; callbacks are
    /// disabled when unset
    pub callback_url: Option<String>,
    #[serde(default = "default_kie_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_kie_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for KieConfig {
    fn default() -> Self {
        Self {
            base_url: default_kie_base_url(),
            api_key: None,
            callback_url: None,
            connect_timeout_secs: default_kie_connect_timeout_secs(),
            request_timeout_secs: default_kie_request_timeout_secs(),
        }
    }
}

fn default_kie_base_url() -> String {
    "https://api.kie.ai".to_string()
}

fn default_kie_connect_timeout_secs() -> u64 {
    10
}

fn default_kie_request_timeout_secs() -> u64 {
    60
}

/// Generation pipeline configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerationConfig {
    /// Copy provider results into our bucket on success. When disabled
    /// the provider's own URL is returned to clients.
    #[serde(default = "default_mirror_results")]
    pub mirror_results: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mirror_results: default_mirror_results(),
        }
    }
}

fn default_mirror_results() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.server.api.max_payload_bytes, 256 * 1024);
        assert_eq!(config.server.api.max_styles_per_request, 6);
        assert_eq!(config.storage.provider, StorageProvider::Local);
        assert_eq!(config.kie.base_url, "https://api.kie.ai");
        assert!(config.kie.api_key.is_none());
        assert!(config.kie.callback_url.is_none());
        assert!(config.generation.mirror_results);
    }

    #[test]
    fn test_secrets_never_serialize() {
        let mut config = Config::default();
        config.kie.api_key = Some("kie-secret".to_string());
        config.storage.access_key = Some("ak".to_string());
        config.storage.secret_key = Some("sk".to_string());

        let serialized = toml::to_string(&config).unwrap();
        assert!(!serialized.contains("kie-secret"));
        assert!(!serialized.contains("access_key"));
        assert!(!serialized.contains("secret_key"));
    }
}
