//! Outbound clients for the external generation provider

pub mod kie;
pub mod report;

pub use kie::{KieClient, KieOptions};
pub use report::{Outcome, ProviderReport};

use async_trait::async_trait;
use thiserror::Error;

use crate::tasks::model::{Provider, ProviderRequest};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("provider returned code {code}: {message}")]
    Api { code: i64, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::RequestFailed(err.to_string())
        }
    }
}

/// Submission and status seam in front of the concrete provider API.
/// `KieClient` is the production implementation; tests script their own.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Submit a generation request and return the provider's job id
    async fn submit(&self, request: &ProviderRequest) -> Result<String>;

    /// Fetch the provider-native status report for a submitted job
    async fn query(&self, provider: Provider, job_id: &str) -> Result<ProviderReport>;
}
