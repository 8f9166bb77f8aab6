//! Persisted task rows and their vocabulary

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle status of a generation task
///
/// Transitions are monotonic: `pending -> running -> succeeded | failed`.
/// Terminal states never change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Which upstream generation API a task is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// GPT-4o image edit endpoint (multi-reference, 4 variants per call)
    #[serde(rename = "kie_4o")]
    Kie4o,
    /// Flux Kontext edit endpoint (single input image)
    #[serde(rename = "kie_kontext")]
    KieKontext,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Provider::Kie4o => "kie_4o",
            Provider::KieKontext => "kie_kontext",
        };
        write!(f, "{}", s)
    }
}

/// GPT-4o image generation payload, sent verbatim to the provider
///
/// Field names follow the provider wire format (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gpt4oRequest {
    /// Input photo first, then optional style/color reference images
    pub files_url: Vec<String>,
    pub prompt: String,
    /// Aspect ratio, e.g. "2:3"
    pub size: String,
    /// Number of output variants, as a string per the wire format
    pub n_variants: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_back_url: Option<String>,
}

/// Flux Kontext generation payload, sent verbatim to the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KontextRequest {
    pub input_image: String,
    pub prompt: String,
    /// Aspect ratio, e.g. "3:4"
    pub aspect_ratio: String,
    pub model: String,
    pub output_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_back_url: Option<String>,
}

/// Frozen provider request, built once at intake and replayed at start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider")]
pub enum ProviderRequest {
    #[serde(rename = "kie_4o")]
    Gpt4o(Gpt4oRequest),
    #[serde(rename = "kie_kontext")]
    Kontext(KontextRequest),
}

impl ProviderRequest {
    pub fn provider(&self) -> Provider {
        match self {
            ProviderRequest::Gpt4o(_) => Provider::Kie4o,
            ProviderRequest::Kontext(_) => Provider::KieKontext,
        }
    }
}

/// Display metadata echoed back to clients alongside results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExt {
    /// Requested hairstyle name
    pub hairstyle: String,
    /// Requested hair color name; absent when no concrete color was chosen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haircolor: Option<String>,
}

/// One generation task row
///
/// `task_no` is our identifier; `task_id` is the provider's job id and is
/// set exactly when the task has left `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_no: String,
    pub user_id: String,
    pub task_id: Option<String>,
    pub status: TaskStatus,
    pub provider: Provider,
    /// Payload replayed to the provider when the task starts
    pub request_param: ProviderRequest,
    /// Original user selections, kept for diagnostics
    pub input_params: Value,
    pub ext: TaskExt,
    pub aspect: String,
    /// Earliest moment the task may be submitted to the provider
    pub estimated_start_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_url: Option<String>,
    /// Raw provider report captured at the terminal transition
    pub result_data: Option<Value>,
    pub fail_reason: Option<String>,
}

/// Partial update applied to a task row; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub task_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result_url: Option<String>,
    pub result_data: Option<Value>,
    pub fail_reason: Option<String>,
}

impl Task {
    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(task_id) = patch.task_id {
            self.task_id = Some(task_id);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        if let Some(completed_at) = patch.completed_at {
            self.completed_at = Some(completed_at);
        }
        if let Some(result_url) = patch.result_url {
            self.result_url = Some(result_url);
        }
        if let Some(result_data) = patch.result_data {
            self.result_data = Some(result_data);
        }
        if let Some(fail_reason) = patch.fail_reason {
            self.fail_reason = Some(fail_reason);
        }
    }
}
