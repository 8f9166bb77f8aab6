//! Provider-native status payloads and their normalized outcome
//!
//! The two endpoints speak different dialects: GPT-4o reports a status
//! string plus a fractional progress, Kontext reports a numeric success
//! flag. `Outcome` folds both into one vocabulary for the lifecycle
//! engine.

use serde::{Deserialize, Serialize};

/// Progress ceiling while the provider still reports work in flight.
/// 1.0 is reserved for terminal states.
pub const MAX_RUNNING_PROGRESS: f64 = 0.99;

/// Status vocabulary of the GPT-4o image endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gpt4oStatus {
    Generating,
    Success,
    CreateTaskFailed,
    GenerateFailed,
    /// Any status string we do not recognize
    #[serde(other)]
    Unknown,
}

impl Gpt4oStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Gpt4oStatus::Generating => "GENERATING",
            Gpt4oStatus::Success => "SUCCESS",
            Gpt4oStatus::CreateTaskFailed => "CREATE_TASK_FAILED",
            Gpt4oStatus::GenerateFailed => "GENERATE_FAILED",
            Gpt4oStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gpt4oResponse {
    #[serde(default)]
    pub result_urls: Vec<String>,
}

/// GPT-4o record-info payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gpt4oTaskDetail {
    #[serde(default)]
    pub task_id: Option<String>,
    pub status: Gpt4oStatus,
    /// Fraction as a string, e.g. "0.42"
    #[serde(default)]
    pub progress: Option<String>,
    #[serde(default)]
    pub response: Option<Gpt4oResponse>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KontextResponse {
    #[serde(default)]
    pub result_image_url: Option<String>,
    #[serde(default)]
    pub origin_image_url: Option<String>,
}

/// Kontext record-info payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KontextTaskDetail {
    #[serde(default)]
    pub task_id: Option<String>,
    /// 0 = generating, 1 = success, anything else = failure
    pub success_flag: i64,
    #[serde(default)]
    pub response: Option<KontextResponse>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// A status report from either endpoint, kept in provider-native shape
/// so the raw payload can be persisted alongside the terminal state
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProviderReport {
    Gpt4o(Gpt4oTaskDetail),
    Kontext(KontextTaskDetail),
}

/// Normalized view over both provider vocabularies
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Still generating; `progress` is a fraction in [0.0, 0.99]
    InProgress { progress: f64 },
    /// Provider claims success; the URL may still be missing
    Success { result_url: Option<String> },
    /// Terminal provider-side failure
    Failure { reason: String },
}

impl ProviderReport {
    pub fn outcome(&self) -> Outcome {
        match self {
            ProviderReport::Gpt4o(detail) => detail.outcome(),
            ProviderReport::Kontext(detail) => detail.outcome(),
        }
    }
}

impl Gpt4oTaskDetail {
    pub fn outcome(&self) -> Outcome {
        match self.status {
            Gpt4oStatus::Generating => Outcome::InProgress {
                progress: parse_progress(self.progress.as_deref()),
            },
            Gpt4oStatus::Success => Outcome::Success {
                result_url: self
                    .response
                    .as_ref()
                    .and_then(|r| r.result_urls.first().cloned()),
            },
            status => Outcome::Failure {
                reason: self
                    .error_message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("provider reported {}", status.as_str())),
            },
        }
    }
}

impl KontextTaskDetail {
    pub fn outcome(&self) -> Outcome {
        match self.success_flag {
            // Kontext has no incremental progress, only a waiting state
            0 => Outcome::InProgress { progress: 0.0 },
            1 => Outcome::Success {
                result_url: self.response.as_ref().and_then(|r| {
                    r.result_image_url
                        .clone()
                        .or_else(|| r.origin_image_url.clone())
                }),
            },
            flag => Outcome::Failure {
                reason: self
                    .error_message
                    .clone()
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| format!("provider reported failure flag {}", flag)),
            },
        }
    }
}

/// Parse the GPT-4o progress string into a clamped fraction.
/// Unparseable or absent values count as 0.
fn parse_progress(raw: Option<&str>) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .map(|p| p.clamp(0.0, MAX_RUNNING_PROGRESS))
        .unwrap_or(0.0)
}
