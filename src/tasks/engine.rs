//! Task lifecycle engine: start, poll, reconcile
//!
//! Transitions are committed through `TaskStore` one whole row at a time.
//! The engine never partially commits: a provider call that fails leaves
//! the row exactly as it was.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ledger::error::LedgerError;
use crate::ledger::store::TaskStore;
use crate::observability::Metrics;
use crate::provider::report::Outcome;
use crate::provider::{ProviderClient, ProviderError};
use crate::storage::relocate::AssetRelocator;

use super::model::{Task, TaskPatch, TaskStatus};

/// Storage namespace for mirrored generation results
const RESULT_NAMESPACE: &str = "result/hairstyle";
/// Providers deliver results as PNG
const RESULT_EXT: &str = "png";

/// Failure reason recorded when a provider claims success but no result
/// URL can be extracted from its report
pub const MISSING_RESULT_REASON: &str = "Result url not retrieved";

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("no task with number {0}")]
    NotFound(String),

    #[error("no running task for provider job {0}")]
    UnknownProviderJob(String),

    #[error("task {0} is running without a provider job id")]
    MissingProviderJob(String),

    #[error("task {task_no} cannot start from status {status}")]
    NotPending { task_no: String, status: TaskStatus },

    #[error("task {task_no} is not due to start until {due}")]
    NotYetDue {
        task_no: String,
        due: DateTime<Utc>,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TaskError {
    /// Errors meaning only that the task could not start right now:
    /// the schedule has not been reached, or the provider refused the
    /// submission. `reconcile` reports these as "still pending".
    pub fn is_start_refusal(&self) -> bool {
        matches!(self, TaskError::NotYetDue { .. } | TaskError::Provider(_))
    }
}

/// A task row together with the progress fraction reported to callers:
/// 0 until the provider reports incremental progress, 1 once terminal
#[derive(Debug, Clone)]
pub struct TaskProgress {
    pub task: Task,
    pub progress: f64,
}

/// Drives tasks through `pending -> running -> succeeded | failed`
pub struct LifecycleEngine {
    store: Arc<TaskStore>,
    provider: Arc<dyn ProviderClient>,
    relocator: Arc<dyn AssetRelocator>,
    metrics: Arc<Metrics>,
    mirror_results: bool,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<TaskStore>,
        provider: Arc<dyn ProviderClient>,
        relocator: Arc<dyn AssetRelocator>,
        metrics: Arc<Metrics>,
        mirror_results: bool,
    ) -> Self {
        Self {
            store,
            provider,
            relocator,
            metrics,
            mirror_results,
        }
    }

    /// Start a pending task: submit its frozen request to the provider
    /// and commit `pending -> running` with the provider's job id.
    ///
    /// Refuses tasks that are not pending or not yet due. When the
    /// provider call fails nothing is committed and the task stays
    /// pending.
    pub async fn start(&self, task: &Task) -> Result<Task, TaskError> {
        if task.status != TaskStatus::Pending {
            return Err(TaskError::NotPending {
                task_no: task.task_no.clone(),
                status: task.status,
            });
        }
        let now = Utc::now();
        if task.estimated_start_at > now {
            return Err(TaskError::NotYetDue {
                task_no: task.task_no.clone(),
                due: task.estimated_start_at,
            });
        }

        let job_id = self.provider.submit(&task.request_param).await?;

        let updated = self.store.update(
            &task.task_no,
            TaskPatch {
                task_id: Some(job_id.clone()),
                status: Some(TaskStatus::Running),
                started_at: Some(now),
                ..TaskPatch::default()
            },
        )?;
        self.metrics.task_started();
        info!(task_no = %task.task_no, provider = %task.provider, job_id, "Task started");
        Ok(updated)
    }

    /// Reconcile a task by its task number: start it if pending and due,
    /// poll the provider if running, report terminal rows as-is.
    pub async fn reconcile(&self, task_no: &str) -> Result<TaskProgress, TaskError> {
        let task = self
            .store
            .get(task_no)?
            .ok_or_else(|| TaskError::NotFound(task_no.to_string()))?;
        self.reconcile_task(task).await
    }

    /// Reconcile an already loaded task row
    pub async fn reconcile_task(&self, task: Task) -> Result<TaskProgress, TaskError> {
        match task.status {
            TaskStatus::Pending => match self.start(&task).await {
                Ok(started) => Ok(TaskProgress {
                    task: started,
                    progress: 0.0,
                }),
                Err(err) if err.is_start_refusal() => {
                    debug!(task_no = %task.task_no, error = %err, "Start deferred");
                    Ok(TaskProgress {
                        task,
                        progress: 0.0,
                    })
                }
                Err(err) => Err(err),
            },
            TaskStatus::Running => self.poll(task).await,
            TaskStatus::Succeeded | TaskStatus::Failed => Ok(TaskProgress {
                task,
                progress: 1.0,
            }),
        }
    }

    /// Entry point for provider push notifications. Only running tasks
    /// are eligible; anything else means the notification does not match
    /// our records.
    pub async fn reconcile_by_provider_job(&self, job_id: &str) -> Result<TaskProgress, TaskError> {
        let task = self
            .store
            .get_by_provider_job(job_id)?
            .filter(|task| task.status == TaskStatus::Running)
            .ok_or_else(|| TaskError::UnknownProviderJob(job_id.to_string()))?;
        self.reconcile_task(task).await
    }

    /// Poll the provider for a running task and commit the terminal
    /// transition when the report is conclusive
    async fn poll(&self, task: Task) -> Result<TaskProgress, TaskError> {
        let job_id = task
            .task_id
            .clone()
            .ok_or_else(|| TaskError::MissingProviderJob(task.task_no.clone()))?;

        let report = self.provider.query(task.provider, &job_id).await?;
        let raw = serde_json::to_value(&report)?;

        match report.outcome() {
            Outcome::InProgress { progress } => {
                debug!(task_no = %task.task_no, progress, "Generation in progress");
                Ok(TaskProgress { task, progress })
            }
            Outcome::Success {
                result_url: Some(url),
            } => {
                let result_url = self.mirror_result(&task, url).await;
                let updated = self.store.update(
                    &task.task_no,
                    TaskPatch {
                        status: Some(TaskStatus::Succeeded),
                        completed_at: Some(Utc::now()),
                        result_url: Some(result_url),
                        result_data: Some(raw),
                        ..TaskPatch::default()
                    },
                )?;
                self.metrics.task_succeeded();
                info!(task_no = %task.task_no, "Task succeeded");
                Ok(TaskProgress {
                    task: updated,
                    progress: 1.0,
                })
            }
            // A success signal without extractable output is not trusted
            Outcome::Success { result_url: None } => {
                self.fail(&task, MISSING_RESULT_REASON.to_string(), raw)
            }
            Outcome::Failure { reason } => self.fail(&task, reason, raw),
        }
    }

    fn fail(&self, task: &Task, reason: String, raw: Value) -> Result<TaskProgress, TaskError> {
        let updated = self.store.update(
            &task.task_no,
            TaskPatch {
                status: Some(TaskStatus::Failed),
                completed_at: Some(Utc::now()),
                fail_reason: Some(reason.clone()),
                result_data: Some(raw),
                ..TaskPatch::default()
            },
        )?;
        self.metrics.task_failed();
        warn!(task_no = %task.task_no, reason, "Task failed");
        Ok(TaskProgress {
            task: updated,
            progress: 1.0,
        })
    }

    /// Best-effort copy of the provider result into our bucket. On any
    /// relocation failure the provider URL is kept as the result.
    async fn mirror_result(&self, task: &Task, provider_url: String) -> String {
        if !self.mirror_results {
            return provider_url;
        }
        match self
            .relocator
            .relocate(&provider_url, RESULT_NAMESPACE, &task.task_no, RESULT_EXT)
            .await
        {
            Ok(hosted) => hosted,
            Err(err) => {
                warn!(
                    task_no = %task.task_no,
                    error = %err,
                    "Result relocation failed, keeping provider URL"
                );
                provider_url
            }
        }
    }
}
