//! Task handler contract between the scheduler and the clip pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use clipnote_core::traits::TaskRepository;
use clipnote_core::{ClipReport, ClipStatus, Task};

/// Progress callback invoked alongside repository updates (events, logs).
pub type ProgressCallback = Box<dyn Fn(i32, &str, &str) + Send + Sync>;

/// Context handed to a task handler for one execution.
pub struct TaskContext {
    /// Snapshot of the task being processed.
    pub task: Task,
    tasks: Arc<dyn TaskRepository>,
    progress_callback: Option<ProgressCallback>,
}

impl TaskContext {
    pub fn new(task: Task, tasks: Arc<dyn TaskRepository>) -> Self {
        Self {
            task,
            tasks,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, &str, &str) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Persist a progress update and notify the callback.
    ///
    /// Persistence failures are logged, not propagated: losing one progress
    /// tick must never fail the task itself.
    pub async fn progress(&self, percent: i32, stage: &str, message: &str) {
        if let Err(e) = self
            .tasks
            .update_progress(self.task.id, percent, stage, message)
            .await
        {
            error!(task_id = %self.task.id, error = %e, "failed to persist progress");
        }
        if let Some(ref callback) = self.progress_callback {
            callback(percent, stage, message);
        }
    }

    pub fn url(&self) -> &str {
        &self.task.url
    }
}

/// Result of one task execution.
#[derive(Debug)]
pub enum TaskResult {
    /// The clip finished; the report carries the outcome class and note.
    Success(ClipReport),
    /// The pipeline failed with an error message.
    Failed(String),
}

/// Executes one task end-to-end.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, ctx: TaskContext) -> TaskResult;
}

/// No-op handler for testing the scheduler without a pipeline.
pub struct NoOpTaskHandler;

#[async_trait]
impl TaskHandler for NoOpTaskHandler {
    async fn execute(&self, ctx: TaskContext) -> TaskResult {
        ctx.progress(50, "processing", "half way").await;
        TaskResult::Success(ClipReport {
            status: ClipStatus::Success,
            message: format!("no-op clip of {}", ctx.url()),
            note: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::InMemoryTaskStore;
    use clipnote_core::Priority;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_context_progress_persists_and_notifies() {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = Task::new("https://example.com", Priority::Normal, false);
        let id = task.id;
        store.insert(task.clone()).await.unwrap();

        let seen: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        let ctx = TaskContext::new(task, store.clone()).with_progress_callback(
            move |percent, _stage, _message| {
                seen_cb.lock().unwrap().push(percent);
            },
        );

        ctx.progress(30, "fetching", "loading page").await;

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.progress, 30);
        assert_eq!(stored.stage, "fetching");
        assert_eq!(*seen.lock().unwrap(), vec![30]);
    }

    #[tokio::test]
    async fn test_noop_handler_succeeds() {
        let store = Arc::new(InMemoryTaskStore::new());
        let task = Task::new("https://example.com", Priority::Normal, false);
        store.insert(task.clone()).await.unwrap();

        let result = NoOpTaskHandler.execute(TaskContext::new(task, store)).await;
        match result {
            TaskResult::Success(report) => assert_eq!(report.status, ClipStatus::Success),
            TaskResult::Failed(e) => panic!("unexpected failure: {e}"),
        }
    }
}
