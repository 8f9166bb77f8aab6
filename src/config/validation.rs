use super::models::{Config, StorageProvider};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.api.max_styles_per_request must be at least 1")]
    ZeroStyleLimit,

    #[error("server.api.max_payload_bytes must be at least 1024")]
    PayloadCapTooSmall,

    #[error("storage.bucket must not be empty")]
    EmptyBucket,

    #[error("storage.cdn_url must be an http(s) URL, got '{0}'")]
    InvalidCdnUrl(String),

    #[error("Storage provider is S3 but missing credentials (access_key or secret_key)")]
    MissingS3Credentials,

    #[error("kie.base_url must be an http(s) URL, got '{0}'")]
    InvalidKieBaseUrl(String),

    #[error("kie.callback_url must be an http(s) URL when set, got '{0}'")]
    InvalidCallbackUrl(String),
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_api_limits(config)?;
    validate_storage(config)?;
    validate_kie(config)?;
    Ok(())
}

fn validate_api_limits(config: &Config) -> Result<(), ValidationError> {
    if config.server.api.max_styles_per_request == 0 {
        return Err(ValidationError::ZeroStyleLimit);
    }
    if config.server.api.max_payload_bytes < 1024 {
        return Err(ValidationError::PayloadCapTooSmall);
    }
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.bucket.is_empty() {
        return Err(ValidationError::EmptyBucket);
    }
    if !is_http_url(&config.storage.cdn_url) {
        return Err(ValidationError::InvalidCdnUrl(
            config.storage.cdn_url.clone(),
        ));
    }
    if config.storage.provider == StorageProvider::S3
        && (config.storage.access_key.is_none() || config.storage.secret_key.is_none())
    {
        return Err(ValidationError::MissingS3Credentials);
    }
    Ok(())
}

fn validate_kie(config: &Config) -> Result<(), ValidationError> {
    if !is_http_url(&config.kie.base_url) {
        return Err(ValidationError::InvalidKieBaseUrl(
            config.kie.base_url.clone(),
        ));
    }
    if let Some(callback_url) = &config.kie.callback_url {
        if !is_http_url(callback_url) {
            return Err(ValidationError::InvalidCallbackUrl(callback_url.clone()));
        }
    }
    Ok(())
}

pub(crate) fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_zero_style_limit() {
        let mut config = Config::default();
        config.server.api.max_styles_per_request = 0;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::ZeroStyleLimit)));
    }

    #[test]
    fn test_empty_bucket() {
        let mut config = Config::default();
        config.storage.bucket.clear();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::EmptyBucket)));
    }

    #[test]
    fn test_invalid_cdn_url() {
        let mut config = Config::default();
        config.storage.cdn_url = "cdn.example.com".to_string();

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidCdnUrl(_))));
    }

    #[test]
    fn test_s3_credentials_missing() {
        let mut config = Config::default();
        config.storage.provider = StorageProvider::S3;
        config.storage.access_key = None;

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::MissingS3Credentials)));
    }

    #[test]
    fn test_s3_credentials_present() {
        let mut config = Config::default();
        config.storage.provider = StorageProvider::S3;
        config.storage.access_key = Some("ak".to_string());
        config.storage.secret_key = Some("sk".to_string());

        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_callback_url() {
        let mut config = Config::default();
        config.kie.callback_url = Some("not-a-url".to_string());

        let result = validate(&config);
        assert!(matches!(result, Err(ValidationError::InvalidCallbackUrl(_))));
    }
}
