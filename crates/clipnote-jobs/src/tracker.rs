//! In-memory task and batch tracking.
//!
//! Backs the scheduler with a `RwLock`-guarded map per record type. Records
//! are never deleted: a status poll for any id ever issued keeps answering.
//! The terminal-transition guards here are what protect batch counters from
//! double-counting.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use clipnote_core::traits::{BatchRepository, TaskRepository};
use clipnote_core::{Batch, BatchStatus, ClipReport, Error, Result, Task, TaskStatus};

/// In-memory implementation of [`TaskRepository`] and [`BatchRepository`].
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    batches: RwLock<HashMap<Uuid, Batch>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn insert(&self, task: Task) -> Result<()> {
        self.tasks.write().await.insert(task.id, task);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn start(&self, id: Uuid) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(Error::TaskNotFound(id))?;
        if task.status != TaskStatus::Queued {
            return Ok(false);
        }
        task.status = TaskStatus::Processing;
        task.stage = "processing".to_string();
        task.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        progress: i32,
        stage: &str,
        message: &str,
    ) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(Error::TaskNotFound(id))?;
        if task.status.is_terminal() {
            return Ok(());
        }
        // Non-decreasing, and 100 is reserved for terminal transitions.
        task.progress = task.progress.max(progress.clamp(0, 99));
        task.stage = stage.to_string();
        task.message = message.to_string();
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn complete(&self, id: Uuid, report: ClipReport) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(Error::TaskNotFound(id))?;
        if task.status.is_terminal() {
            return Ok(false);
        }
        task.status = TaskStatus::Completed;
        task.progress = 100;
        task.stage = "completed".to_string();
        task.message = report.message.clone();
        task.result = Some(report);
        task.updated_at = Utc::now();
        Ok(true)
    }

    async fn fail(&self, id: Uuid, message: &str) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(Error::TaskNotFound(id))?;
        if task.status.is_terminal() {
            return Ok(false);
        }
        task.status = TaskStatus::Failed;
        task.progress = 100;
        task.stage = "failed".to_string();
        task.message = message.to_string();
        task.result = Some(ClipReport::error(message));
        task.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl BatchRepository for InMemoryTaskStore {
    async fn insert(&self, batch: Batch) -> Result<()> {
        self.batches.write().await.insert(batch.id, batch);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Batch>> {
        Ok(self.batches.read().await.get(&id).cloned())
    }

    async fn record_terminal(&self, id: Uuid, success: bool) -> Result<Batch> {
        let mut batches = self.batches.write().await;
        let batch = batches.get_mut(&id).ok_or(Error::BatchNotFound(id))?;
        if batch.processed < batch.total {
            batch.processed += 1;
            if success {
                batch.success_count += 1;
            } else {
                batch.failed_count += 1;
            }
            if batch.processed == batch.total {
                batch.status = BatchStatus::Completed;
            }
            batch.updated_at = Utc::now();
        }
        Ok(batch.clone())
    }
}
