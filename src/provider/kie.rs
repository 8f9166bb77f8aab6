//! KIE AI HTTP client for the two image generation endpoints
//!
//! Both endpoints wrap their payloads in a `{code, msg, data}` envelope;
//! `code` 200 means success regardless of the HTTP status line.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::tasks::model::{Gpt4oRequest, KontextRequest, Provider, ProviderRequest};

use super::report::{Gpt4oTaskDetail, KontextTaskDetail, ProviderReport};
use super::{ProviderClient, ProviderError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.kie.ai";

const GPT4O_GENERATE: &str = "/api/v1/gpt4o-image/generate";
const GPT4O_RECORD_INFO: &str = "/api/v1/gpt4o-image/record-info";
const KONTEXT_GENERATE: &str = "/api/v1/flux/kontext/generate";
const KONTEXT_RECORD_INFO: &str = "/api/v1/flux/kontext/record-info";

/// KIE client configuration
#[derive(Debug, Clone)]
pub struct KieOptions {
    pub base_url: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for KieOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// Response envelope shared by all KIE endpoints
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T> {
        if self.code != 200 {
            return Err(ProviderError::Api {
                code: self.code,
                message: self.msg.unwrap_or_default(),
            });
        }
        self.data
            .ok_or_else(|| ProviderError::Malformed("envelope carried no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedTask {
    task_id: String,
}

/// HTTP client for the KIE generation API
pub struct KieClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KieClient {
    pub fn new(options: KieOptions) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(options.connect_timeout)
            .timeout(options.request_timeout)
            .user_agent(concat!("salon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            api_key: options.api_key,
        })
    }

    pub async fn create_gpt4o_task(&self, request: &Gpt4oRequest) -> Result<String> {
        let created: CreatedTask = self.post_json(GPT4O_GENERATE, request).await?;
        Ok(created.task_id)
    }

    pub async fn query_gpt4o_task(&self, task_id: &str) -> Result<Gpt4oTaskDetail> {
        self.get_json(GPT4O_RECORD_INFO, task_id).await
    }

    pub async fn create_kontext_task(&self, request: &KontextRequest) -> Result<String> {
        let created: CreatedTask = self.post_json(KONTEXT_GENERATE, request).await?;
        Ok(created.task_id)
    }

    pub async fn query_kontext_task(&self, task_id: &str) -> Result<KontextTaskDetail> {
        self.get_json(KONTEXT_RECORD_INFO, task_id).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: serde::Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Submitting provider request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, task_id: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, task_id, "Querying provider job");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .query(&[("taskId", task_id)])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        let envelope: Envelope<T> = response.json().await?;
        envelope.into_data()
    }
}

#[async_trait]
impl ProviderClient for KieClient {
    async fn submit(&self, request: &ProviderRequest) -> Result<String> {
        match request {
            ProviderRequest::Gpt4o(req) => self.create_gpt4o_task(req).await,
            ProviderRequest::Kontext(req) => self.create_kontext_task(req).await,
        }
    }

    async fn query(&self, provider: Provider, job_id: &str) -> Result<ProviderReport> {
        match provider {
            Provider::Kie4o => Ok(ProviderReport::Gpt4o(self.query_gpt4o_task(job_id).await?)),
            Provider::KieKontext => Ok(ProviderReport::Kontext(
                self.query_kontext_task(job_id).await?,
            )),
        }
    }
}
