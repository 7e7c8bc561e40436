//! Task scheduler: priority queue, dispatch loop, and status surface.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use clipnote_core::traits::{BatchRepository, TaskRepository};
use clipnote_core::{
    defaults, Batch, BatchInfo, BatchReceipt, BatchStatus, Error, Priority, Result, SubmitReceipt,
    Task, TaskStatus, TaskStatusReport,
};

use crate::batch::BatchAggregator;
use crate::handler::{TaskContext, TaskHandler, TaskResult};

/// Configuration for the task scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrently processing tasks.
    pub max_concurrent: usize,
    /// Whether to enable task processing.
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::TASK_POLL_INTERVAL_MS,
            max_concurrent: defaults::TASK_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl SchedulerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `TASK_SCHEDULER_ENABLED` | `true` | Enable/disable task processing |
    /// | `TASK_MAX_CONCURRENT` | `3` | Max concurrent tasks |
    /// | `TASK_POLL_INTERVAL_MS` | `500` | Polling interval when idle |
    pub fn from_env() -> Self {
        let enabled = std::env::var("TASK_SCHEDULER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent = std::env::var("TASK_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::TASK_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("TASK_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::TASK_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            max_concurrent,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent tasks.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    /// Enable or disable task processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// A task was dispatched and started processing.
    TaskStarted { task_id: Uuid },
    /// Task progress was updated.
    TaskProgress {
        task_id: Uuid,
        percent: i32,
        stage: String,
    },
    /// A task completed successfully.
    TaskCompleted { task_id: Uuid },
    /// A task failed.
    TaskFailed { task_id: Uuid, error: String },
    /// Scheduler started.
    SchedulerStarted,
    /// Scheduler stopped.
    SchedulerStopped,
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<SchedulerEvent>,
}

impl SchedulerHandle {
    /// Signal the scheduler to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for scheduler events.
    pub fn events(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.event_rx.resubscribe()
    }
}

/// One queued entry: priority rank plus submission sequence.
///
/// The heap pops the entry with the lowest `(rank, seq)`, which gives
/// priority-tier ordering with FIFO inside each tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    rank: u8,
    seq: u64,
    task_id: Uuid,
    batch_id: Option<Uuid>,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the std max-heap behaves as a min-heap.
        (other.rank, other.seq).cmp(&(self.rank, self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending queue and in-flight set, guarded by one lock so the ceiling check
/// and the pop are atomic.
#[derive(Default)]
struct QueueState {
    pending: BinaryHeap<QueueEntry>,
    in_flight: HashSet<Uuid>,
    next_seq: u64,
    /// Per-batch concurrency caps, from the batch submission hint.
    batch_limits: HashMap<Uuid, usize>,
    /// In-flight count per capped batch.
    batch_in_flight: HashMap<Uuid, usize>,
}

impl QueueState {
    fn enqueue(&mut self, task_id: Uuid, priority: Priority, batch_id: Option<Uuid>) {
        let entry = QueueEntry {
            rank: priority.rank(),
            seq: self.next_seq,
            task_id,
            batch_id,
        };
        self.next_seq += 1;
        self.pending.push(entry);
    }

    fn release(&mut self, entry: &QueueEntry) {
        self.in_flight.remove(&entry.task_id);
        let Some(batch_id) = entry.batch_id else {
            return;
        };
        if let Some(count) = self.batch_in_flight.get_mut(&batch_id) {
            *count = count.saturating_sub(1);
            // Drop the batch's bookkeeping once nothing of it is running
            // or pending, so the maps don't grow for the process lifetime.
            if *count == 0 && !self.pending.iter().any(|e| e.batch_id == Some(batch_id)) {
                self.batch_in_flight.remove(&batch_id);
                self.batch_limits.remove(&batch_id);
            }
        }
    }
}

/// Options for a single-URL submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub priority: Priority,
    /// Run the text-analysis step after clipping.
    pub use_summary: bool,
}

/// Options for a batch submission.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub priority: Priority,
    /// Run the text-analysis step after each clip.
    pub use_summary: bool,
    /// Cap on this batch's concurrently processing sub-tasks. The global
    /// ceiling still applies on top.
    pub max_concurrency: Option<usize>,
}

/// Task scheduler that dispatches clip tasks up to a concurrency ceiling.
pub struct Scheduler {
    config: SchedulerConfig,
    tasks: Arc<dyn TaskRepository>,
    batches: Arc<dyn BatchRepository>,
    handler: Arc<dyn TaskHandler>,
    queue: Arc<Mutex<QueueState>>,
    event_tx: broadcast::Sender<SchedulerEvent>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        tasks: Arc<dyn TaskRepository>,
        batches: Arc<dyn BatchRepository>,
        handler: Arc<dyn TaskHandler>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            config,
            tasks,
            batches,
            handler,
            queue: Arc::new(Mutex::new(QueueState::default())),
            event_tx,
        }
    }

    /// Get a receiver for scheduler events.
    pub fn events(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.event_tx.subscribe()
    }

    /// Number of tasks waiting in the queue.
    pub async fn pending_count(&self) -> usize {
        self.queue.lock().await.pending.len()
    }

    /// Number of tasks currently processing.
    pub async fn in_flight_count(&self) -> usize {
        self.queue.lock().await.in_flight.len()
    }

    /// Submit one URL for clipping.
    pub async fn submit(&self, url: &str, opts: SubmitOptions) -> Result<SubmitReceipt> {
        let task = Task::new(url, opts.priority, opts.use_summary);
        let task_id = task.id;
        self.tasks.insert(task).await?;
        self.queue.lock().await.enqueue(task_id, opts.priority, None);

        info!(%task_id, url, priority = ?opts.priority, "task submitted");
        Ok(SubmitReceipt {
            task_id,
            status: TaskStatus::Queued,
            progress_url: format!("/api/clip/status/{task_id}"),
        })
    }

    /// Submit a batch of URLs. The batch record is persisted before any
    /// sub-task is enqueued, so a status poll racing the first dispatch
    /// already sees the full sub-task list.
    pub async fn submit_batch(&self, urls: &[String], opts: BatchOptions) -> Result<BatchReceipt> {
        if urls.is_empty() {
            return Err(Error::InvalidInput(
                "batch submission requires at least one url".into(),
            ));
        }

        let tasks: Vec<Task> = urls
            .iter()
            .map(|url| Task::new(url.clone(), opts.priority, opts.use_summary))
            .collect();
        let sub_task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();

        let batch = Batch::new(sub_task_ids.clone());
        let batch_id = batch.id;
        self.batches.insert(batch).await?;

        if let Some(cap) = opts.max_concurrency {
            self.queue
                .lock()
                .await
                .batch_limits
                .insert(batch_id, cap.max(1));
        }

        for task in tasks {
            let task_id = task.id;
            let priority = task.priority;
            self.tasks.insert(task.with_batch(batch_id)).await?;
            self.queue.lock().await.enqueue(task_id, priority, Some(batch_id));
        }

        info!(%batch_id, total = urls.len(), priority = ?opts.priority, "batch submitted");
        Ok(BatchReceipt {
            task_id: batch_id,
            status: TaskStatus::Queued,
            total_urls: urls.len(),
            sub_task_ids,
        })
    }

    /// Status of a task or batch id. Batch ids answer with aggregate figures
    /// plus per-sub-task reports.
    pub async fn task_status(&self, id: Uuid) -> Result<TaskStatusReport> {
        if let Some(task) = self.tasks.get(id).await? {
            return Ok(task_report(&task));
        }

        if let Some(batch) = self.batches.get(id).await? {
            let lookups = batch.sub_task_ids.iter().map(|sub_id| self.tasks.get(*sub_id));
            let sub_reports: Vec<TaskStatusReport> = try_join_all(lookups)
                .await?
                .into_iter()
                .flatten()
                .map(|task| task_report(&task))
                .collect();
            return Ok(batch_report(&batch, sub_reports));
        }

        Err(Error::TaskNotFound(id))
    }

    /// Start the scheduler loop and return a handle for control. The
    /// scheduler itself stays usable for submissions and status queries.
    pub fn start(self: &Arc<Self>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.run(&mut shutdown_rx).await;
        });

        SchedulerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Poll loop: dispatch while there is room under the ceiling, then sleep.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(self: &Arc<Self>, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("task scheduler is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent,
            "task scheduler started"
        );
        let _ = self.event_tx.send(SchedulerEvent::SchedulerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("task scheduler received shutdown signal");
                break;
            }

            self.dispatch_ready().await;

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("task scheduler received shutdown signal");
                    break;
                }
                _ = sleep(poll_interval) => {}
            }
        }

        let _ = self.event_tx.send(SchedulerEvent::SchedulerStopped);
        info!("task scheduler stopped");
    }

    /// Pop and spawn queued tasks until the ceiling is reached or the queue
    /// is empty. Each spawn is fire-and-forget; the spawned body removes its
    /// own id from the in-flight set when it finishes.
    ///
    /// Entries blocked only by their batch's concurrency cap are set aside
    /// and re-queued, keeping their original sequence numbers.
    async fn dispatch_ready(self: &Arc<Self>) {
        let mut deferred: Vec<QueueEntry> = Vec::new();

        // One lock hold for the whole pass, so cap-deferred entries are back
        // in the heap before any release can observe the batch as drained.
        let mut queue = self.queue.lock().await;
        while queue.in_flight.len() < self.config.max_concurrent {
            let Some(entry) = queue.pending.pop() else {
                break;
            };
            if let Some(batch_id) = entry.batch_id {
                if let Some(&cap) = queue.batch_limits.get(&batch_id) {
                    let running = queue.batch_in_flight.get(&batch_id).copied().unwrap_or(0);
                    if running >= cap {
                        deferred.push(entry);
                        continue;
                    }
                }
                *queue.batch_in_flight.entry(batch_id).or_insert(0) += 1;
            }
            queue.in_flight.insert(entry.task_id);

            debug!(task_id = %entry.task_id, rank = entry.rank, "dispatching task");
            let scheduler = self.clone();
            tokio::spawn(async move {
                scheduler.run_dispatched(entry).await;
            });
        }

        for entry in deferred {
            queue.pending.push(entry);
        }
    }

    /// Body of one dispatched task: execute, contain panics, and release the
    /// concurrency slot. A panicking task body still gets a terminal write so
    /// no task is left in `processing`.
    async fn run_dispatched(self: Arc<Self>, entry: QueueEntry) {
        let scheduler = self.clone();
        let task_id = entry.task_id;
        let joined = tokio::spawn(async move {
            scheduler.execute_task(task_id).await;
        })
        .await;

        if let Err(e) = joined {
            error!(%task_id, error = ?e, "task body panicked");
            match self.tasks.fail(task_id, "task body panicked").await {
                Ok(true) => self.record_batch_outcome(entry.batch_id, false).await,
                Ok(false) => {}
                Err(e) => error!(%task_id, error = %e, "failed to mark panicked task failed"),
            }
        }

        self.queue.lock().await.release(&entry);
    }

    /// Execute one dispatched task and record its terminal state.
    async fn execute_task(&self, task_id: Uuid) {
        let started = Instant::now();

        match self.tasks.start(task_id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(%task_id, "task was not queued at dispatch, skipping");
                return;
            }
            Err(e) => {
                error!(%task_id, error = %e, "failed to start task");
                return;
            }
        }

        let task = match self.tasks.get(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) | Err(_) => {
                error!(%task_id, "task disappeared after start");
                return;
            }
        };
        let batch_id = task.batch_id;
        let url = task.url.clone();

        info!(%task_id, %url, "processing task");
        let _ = self.event_tx.send(SchedulerEvent::TaskStarted { task_id });

        let event_tx = self.event_tx.clone();
        let ctx = TaskContext::new(task, self.tasks.clone()).with_progress_callback(
            move |percent, stage, _message| {
                let _ = event_tx.send(SchedulerEvent::TaskProgress {
                    task_id,
                    percent,
                    stage: stage.to_string(),
                });
            },
        );

        let task_timeout = Duration::from_secs(defaults::TASK_TIMEOUT_SECS);
        let result = match tokio::time::timeout(task_timeout, self.handler.execute(ctx)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%task_id, "task exceeded timeout of {}s", defaults::TASK_TIMEOUT_SECS);
                TaskResult::Failed(format!(
                    "task exceeded timeout of {}s",
                    defaults::TASK_TIMEOUT_SECS
                ))
            }
        };

        match result {
            TaskResult::Success(report) => match self.tasks.complete(task_id, report).await {
                Ok(true) => {
                    info!(
                        %task_id,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "task completed"
                    );
                    let _ = self.event_tx.send(SchedulerEvent::TaskCompleted { task_id });
                    self.record_batch_outcome(batch_id, true).await;
                }
                Ok(false) => warn!(%task_id, "task already terminal, completion ignored"),
                Err(e) => error!(%task_id, error = %e, "failed to mark task completed"),
            },
            TaskResult::Failed(message) => match self.tasks.fail(task_id, &message).await {
                Ok(true) => {
                    warn!(
                        %task_id,
                        error = %message,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "task failed"
                    );
                    let _ = self.event_tx.send(SchedulerEvent::TaskFailed {
                        task_id,
                        error: message,
                    });
                    self.record_batch_outcome(batch_id, false).await;
                }
                Ok(false) => warn!(%task_id, "task already terminal, failure ignored"),
                Err(e) => error!(%task_id, error = %e, "failed to mark task failed"),
            },
        }
    }

    /// Fold a sub-task outcome into its batch, if the task belongs to one.
    /// Only reached after a successful terminal transition, so each sub-task
    /// is counted exactly once.
    async fn record_batch_outcome(&self, batch_id: Option<Uuid>, success: bool) {
        let Some(batch_id) = batch_id else {
            return;
        };
        let aggregator = BatchAggregator::new(self.batches.clone());
        if let Err(e) = aggregator.record(batch_id, success).await {
            error!(%batch_id, error = %e, "failed to record batch outcome");
        }
    }
}

/// Build a status report for a single task.
fn task_report(task: &Task) -> TaskStatusReport {
    TaskStatusReport {
        task_id: task.id,
        url: Some(task.url.clone()),
        status: task.status,
        progress: task.progress,
        stage: task.stage.clone(),
        message: task.message.clone(),
        result: task.result.clone(),
        batch_info: None,
        sub_task_statuses: None,
    }
}

/// Build an aggregate status report for a batch.
fn batch_report(batch: &Batch, sub_reports: Vec<TaskStatusReport>) -> TaskStatusReport {
    let status = match batch.status {
        BatchStatus::Processing => TaskStatus::Processing,
        BatchStatus::Completed => TaskStatus::Completed,
    };
    TaskStatusReport {
        task_id: batch.id,
        url: None,
        status,
        progress: batch.progress(),
        stage: "batch".to_string(),
        message: format!("{}/{} processed", batch.processed, batch.total),
        result: None,
        batch_info: Some(BatchInfo {
            batch_id: batch.id,
            total: batch.total,
            processed: batch.processed,
            success_count: batch.success_count,
            failed_count: batch.failed_count,
            progress: batch.progress(),
            status: batch.status,
        }),
        sub_task_statuses: Some(sub_reports),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.poll_interval_ms, defaults::TASK_POLL_INTERVAL_MS);
        assert_eq!(config.max_concurrent, defaults::TASK_MAX_CONCURRENT);
        assert!(config.enabled);
    }

    #[test]
    fn test_scheduler_config_builder() {
        let config = SchedulerConfig::default()
            .with_poll_interval(50)
            .with_max_concurrent(1)
            .with_enabled(false);

        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.max_concurrent, 1);
        assert!(!config.enabled);
    }

    #[test]
    fn test_queue_orders_by_rank_then_seq() {
        let mut state = QueueState::default();
        let normal = Uuid::new_v4();
        let low = Uuid::new_v4();
        let high_a = Uuid::new_v4();
        let high_b = Uuid::new_v4();

        state.enqueue(low, Priority::Low, None);
        state.enqueue(high_a, Priority::High, None);
        state.enqueue(normal, Priority::Normal, None);
        state.enqueue(high_b, Priority::High, None);

        let order: Vec<Uuid> = std::iter::from_fn(|| state.pending.pop())
            .map(|e| e.task_id)
            .collect();
        assert_eq!(order, vec![high_a, high_b, normal, low]);
    }

    #[test]
    fn test_queue_fifo_within_tier() {
        let mut state = QueueState::default();
        let ids: Vec<Uuid> = (0..10).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            state.enqueue(*id, Priority::Normal, None);
        }
        let order: Vec<Uuid> = std::iter::from_fn(|| state.pending.pop())
            .map(|e| e.task_id)
            .collect();
        assert_eq!(order, ids);
    }

    #[test]
    fn test_release_drops_batch_bookkeeping_when_drained() {
        let mut state = QueueState::default();
        let batch_id = Uuid::new_v4();
        state.batch_limits.insert(batch_id, 1);
        state.enqueue(Uuid::new_v4(), Priority::Normal, Some(batch_id));
        state.enqueue(Uuid::new_v4(), Priority::Normal, Some(batch_id));

        let first = state.pending.pop().unwrap();
        *state.batch_in_flight.entry(batch_id).or_insert(0) += 1;
        state.in_flight.insert(first.task_id);
        state.release(&first);
        // A sibling is still pending, so the cap must survive.
        assert_eq!(state.batch_limits.get(&batch_id), Some(&1));

        let second = state.pending.pop().unwrap();
        *state.batch_in_flight.entry(batch_id).or_insert(0) += 1;
        state.in_flight.insert(second.task_id);
        state.release(&second);
        assert!(state.batch_limits.is_empty());
        assert!(state.batch_in_flight.is_empty());
    }

    #[test]
    fn test_batch_report_maps_status() {
        let mut batch = Batch::new(vec![Uuid::new_v4()]);
        let report = batch_report(&batch, Vec::new());
        assert_eq!(report.status, TaskStatus::Processing);
        assert_eq!(report.progress, 0);

        batch.processed = 1;
        batch.success_count = 1;
        batch.status = BatchStatus::Completed;
        let report = batch_report(&batch, Vec::new());
        assert_eq!(report.status, TaskStatus::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.batch_info.unwrap().success_count, 1);
    }
}
