//! API models for the hairstyle generation endpoints.
//!
//! This module defines the core data structures of the external API contract:
//! - Client-facing intake via `POST /api/hairstyles` accepts a [`HairstyleRequest`] payload
//! - Status endpoints return [`TaskStatusResponse`] for task tracking
//! - Provider push notifications arrive as a [`KieWebhookNotice`]
//!
//! # Request Structure
//!
//! A complete submission example (as JSON):
//!
//! ```json
//! {
//!   "photo_url": "https://cdn.example.com/selfies/u-123.jpg",
//!   "provider": "kie_4o",
//!   "styles": [
//!     { "name": "French Bob", "cover": "https://catalog.example.com/french-bob.jpg" },
//!     { "name": "Wolf Cut" }
//!   ],
//!   "color": {
//!     "name": "Chestnut Brown",
//!     "value": "#8B4513",
//!     "cover": "https://catalog.example.com/chestnut.jpg"
//!   },
//!   "detail": "keep the fringe above the eyebrows"
//! }
//! ```
//!
//! # Key Concepts
//!
//! - **Task**: one style variant of one submission; identified by UUIDv7 `task_no`
//! - **Provider job**: the upstream generation job; its id becomes `task_id` once the task starts
//! - **Credits**: every accepted style debits one credit from the calling user

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ledger::CreditReceipt;
use crate::tasks::{ColorChoice, Provider, StyleChoice, Task, TaskStatus};

#[derive(Debug, Deserialize, Clone)]
pub struct HairstyleRequest {
    pub photo_url: String,
    pub provider: Provider,
    pub styles: Vec<StyleChoice>,
    pub color: ColorChoice,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Client-facing projection of a task row.
///
/// The frozen provider payload and raw provider reports stay internal;
/// everything a client needs for rendering is here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskView {
    pub task_no: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub status: TaskStatus,
    pub hairstyle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub haircolor: Option<String>,
    pub aspect: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_reason: Option<String>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            task_no: task.task_no.clone(),
            task_id: task.task_id.clone(),
            status: task.status,
            hairstyle: task.ext.hairstyle.clone(),
            haircolor: task.ext.haircolor.clone(),
            aspect: task.aspect.clone(),
            created_at: task.created_at,
            completed_at: task.completed_at,
            result_url: task.result_url.clone(),
            fail_reason: task.fail_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HairstyleAccepted {
    pub tasks: Vec<TaskView>,
    pub credits: CreditReceipt,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TaskStatusResponse {
    pub task: TaskView,
    /// 0 until the provider reports progress, 1 once terminal
    pub progress: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreditsResponse {
    pub user_id: String,
    pub balance: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GrantRequest {
    pub amount: i64,
}

/// Provider callback body. Only the job id is read; the reported state
/// is re-fetched from the provider before anything is committed.
#[derive(Debug, Deserialize, Clone)]
pub struct KieWebhookNotice {
    pub data: KieWebhookData,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct KieWebhookData {
    pub task_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}
