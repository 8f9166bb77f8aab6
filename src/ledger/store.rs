use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::debug;

use crate::tasks::model::{Task, TaskPatch};

use super::error::{LedgerError, Result};
use super::partitions::{
    PROVIDER_JOBS_PARTITION, TASKS_PARTITION, encode_job_key, encode_task_key,
};

/// Fjall-backed persistent storage for task rows
///
/// Keeps a secondary index from provider job ids to task numbers so
/// webhook notifications can find their task.
#[derive(Clone)]
pub struct TaskStore {
    keyspace: Keyspace,
    tasks: PartitionHandle,
    provider_jobs: PartitionHandle,
}

impl TaskStore {
    /// Attach to partitions in an already opened keyspace
    pub fn attach(keyspace: &Keyspace) -> Result<Self> {
        let tasks = keyspace.open_partition(TASKS_PARTITION, PartitionCreateOptions::default())?;
        let provider_jobs =
            keyspace.open_partition(PROVIDER_JOBS_PARTITION, PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace: keyspace.clone(),
            tasks,
            provider_jobs,
        })
    }

    /// Insert a batch of task rows in one atomic write
    pub fn insert_batch(&self, tasks: Vec<Task>) -> Result<Vec<Task>> {
        let mut batch = self.keyspace.batch();
        for task in &tasks {
            let key = encode_task_key(&task.task_no);
            let value = serde_json::to_vec(task)?;
            batch.insert(&self.tasks, key, value);
        }
        batch.commit()?;
        debug!(count = tasks.len(), "Inserted task batch");
        Ok(tasks)
    }

    /// Get a task by its task number
    pub fn get(&self, task_no: &str) -> Result<Option<Task>> {
        let key = encode_task_key(task_no);
        match self.tasks.get(key)? {
            Some(value) => {
                let task = serde_json::from_slice(&value)?;
                Ok(Some(task))
            }
            None => Ok(None),
        }
    }

    /// Look up a task through the provider job index
    pub fn get_by_provider_job(&self, job_id: &str) -> Result<Option<Task>> {
        let key = encode_job_key(job_id);
        match self.provider_jobs.get(key)? {
            Some(value) => {
                let task_no = String::from_utf8_lossy(&value).to_string();
                self.get(&task_no)
            }
            None => Ok(None),
        }
    }

    /// Apply a partial update to a task row and return the updated row.
    /// When the patch sets a provider job id, the job index is written in
    /// the same atomic batch.
    pub fn update(&self, task_no: &str, patch: TaskPatch) -> Result<Task> {
        let mut task = self
            .get(task_no)?
            .ok_or_else(|| LedgerError::TaskNotFound(task_no.to_string()))?;

        let new_job_id = patch.task_id.clone();
        task.apply(patch);

        let mut batch = self.keyspace.batch();
        if let Some(job_id) = new_job_id {
            batch.insert(&self.provider_jobs, encode_job_key(&job_id), task_no.as_bytes());
        }
        batch.insert(&self.tasks, encode_task_key(task_no), serde_json::to_vec(&task)?);
        batch.commit()?;

        debug!(task_no, status = %task.status, "Updated task");
        Ok(task)
    }

    /// Persist all pending writes to disk
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }

    /// Get internal statistics (for debugging/monitoring)
    pub fn stats(&self) -> Result<StoreStats> {
        let mut task_count = 0;
        let mut indexed_job_count = 0;

        for item in self.tasks.iter() {
            item?;
            task_count += 1;
        }

        for item in self.provider_jobs.iter() {
            item?;
            indexed_job_count += 1;
        }

        Ok(StoreStats {
            task_count,
            indexed_job_count,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StoreStats {
    pub task_count: usize,
    pub indexed_job_count: usize,
}
