//! Core data models for clipnote.
//!
//! These types are shared across all clipnote crates and represent the
//! core domain entities: tasks, batches, and clip results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// TASK TYPES
// =============================================================================

/// Scheduling priority for a task.
///
/// Lower rank dispatches first; ties within a tier keep submission order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Numeric rank used by the scheduler (high=0 < normal=1 < low=2).
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
            Priority::Low => 2,
        }
    }
}

/// Status of a task in the queue.
///
/// Lifecycle is strictly monotonic: `queued → processing → {completed|failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether this status ends the task lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// One unit of work processing a single URL end-to-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub url: String,
    /// Run the text-analysis step after clipping.
    pub use_summary: bool,
    pub priority: Priority,
    pub status: TaskStatus,
    /// 0..=100, non-decreasing; reaches exactly 100 iff status is terminal.
    pub progress: i32,
    /// Pipeline stage currently executing ("queued", "fetching", "rendering", ...).
    pub stage: String,
    /// Human-readable detail for the current stage or failure.
    pub message: String,
    pub result: Option<ClipReport>,
    pub batch_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a freshly queued task.
    pub fn new(url: impl Into<String>, priority: Priority, use_summary: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            use_summary,
            priority,
            status: TaskStatus::Queued,
            progress: 0,
            stage: "queued".to_string(),
            message: String::new(),
            result: None,
            batch_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Tag this task as a member of a batch.
    pub fn with_batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }
}

// =============================================================================
// BATCH TYPES
// =============================================================================

/// Aggregate status of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
}

/// A group of sibling tasks submitted together, tracked for aggregate progress.
///
/// Invariant: `processed = success_count + failed_count <= total`, and status
/// is `completed` iff `processed == total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub sub_task_ids: Vec<Uuid>,
    pub status: BatchStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Create a batch record covering the given sub-tasks.
    pub fn new(sub_task_ids: Vec<Uuid>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            total: sub_task_ids.len(),
            processed: 0,
            success_count: 0,
            failed_count: 0,
            sub_task_ids,
            status: BatchStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    /// Aggregate progress percentage: floor(processed / total * 100).
    pub fn progress(&self) -> i32 {
        if self.total == 0 {
            return 100;
        }
        (self.processed * 100 / self.total) as i32
    }
}

// =============================================================================
// CLIP RESULT TYPES
// =============================================================================

/// Outcome class of a finished clip task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipStatus {
    /// Article already had content; nothing was fetched.
    Exists,
    /// Article row existed and was overwritten with fresh content.
    Updated,
    /// Article was clipped and stored for the first time.
    Success,
    /// Pipeline failed; `note` is absent.
    Error,
}

/// Terminal result of one clip task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipReport {
    pub status: ClipStatus,
    pub message: String,
    /// The structured note, absent on error.
    pub note: Option<RenderedNote>,
}

impl ClipReport {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ClipStatus::Error,
            message: message.into(),
            note: None,
        }
    }
}

/// One rendered property of a note, in template declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteProperty {
    pub name: String,
    pub value: String,
}

/// A structured note produced by the template renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedNote {
    /// Sanitized note name rendered from the template's name format.
    pub name: String,
    /// Property block in declaration order.
    pub properties: Vec<NoteProperty>,
    /// Rendered body.
    pub content: String,
    /// Full Markdown document: YAML frontmatter followed by the body.
    pub markdown: String,
}

// =============================================================================
// ARTICLE TYPES
// =============================================================================

/// A stored article record, keyed by URL in the document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub full_content: String,
    pub full_markdown: String,
    /// Properties extracted by the clip template.
    pub clipper_metadata: JsonValue,
    /// Structured fields produced by the text-analysis collaborator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_fields: Option<JsonValue>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// SUBMISSION / STATUS SURFACES
// =============================================================================

/// Response to a single-URL submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub progress_url: String,
}

/// Response to a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    /// Batch id; pollable through the same status surface as a task id.
    pub task_id: Uuid,
    pub status: TaskStatus,
    pub total_urls: usize,
    pub sub_task_ids: Vec<Uuid>,
}

/// Aggregate batch figures embedded in a status report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInfo {
    pub batch_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub progress: i32,
    pub status: BatchStatus,
}

/// Status poll response for a task or a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusReport {
    pub task_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: TaskStatus,
    pub progress: i32,
    pub stage: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ClipReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_info: Option<BatchInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_task_statuses: Option<Vec<TaskStatusReport>>,
}
