//! Core traits for clipnote abstractions.
//!
//! These traits define the interfaces that concrete implementations must
//! satisfy, enabling pluggable backends and testability. The page renderer,
//! article store, and text analyzer are external collaborators: the crate
//! ships no production implementation for them.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Article, Batch, ClipReport, Task};

// =============================================================================
// PAGE RENDERING COLLABORATOR
// =============================================================================

/// A rendered page, as exposed by the browser-automation collaborator.
///
/// Accessor failures are expected (detached frames, missing nodes); the
/// template engine treats every error here as an empty value.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Document title.
    async fn title(&self) -> Result<String>;

    /// Full document HTML.
    async fn content(&self) -> Result<String>;

    /// Wait until an element matching the selector is attached, or time out.
    async fn wait_for_selector(&self, css: &str, timeout: Duration) -> Result<()>;

    /// Inner text of the first element matching the selector.
    async fn locator_text(&self, css: &str) -> Result<Option<String>>;

    /// Inner HTML of the first element matching the selector.
    async fn locator_html(&self, css: &str) -> Result<Option<String>>;

    /// `content` attribute of `<meta name="...">`, if present.
    async fn meta_attribute(&self, name: &str) -> Result<Option<String>>;
}

/// Navigates URLs into rendered pages.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Navigate to a URL and return a handle to the rendered document.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<Box<dyn PageHandle>>;
}

// =============================================================================
// TASK / BATCH PERSISTENCE
// =============================================================================

/// Key-value persistence for task records.
///
/// Updates are field-level and atomic per call. Terminal transitions are
/// idempotent: `complete`/`fail` return `false` without modifying anything
/// when the task is already terminal, which is what guards batch counters
/// against double-counting.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert a freshly queued task.
    async fn insert(&self, task: Task) -> Result<()>;

    /// Fetch a task by id.
    async fn get(&self, id: Uuid) -> Result<Option<Task>>;

    /// Transition a queued task to `processing`. Returns `false` if the task
    /// was not in `queued`.
    async fn start(&self, id: Uuid) -> Result<bool>;

    /// Update progress/stage/message. Progress is clamped to be non-decreasing.
    async fn update_progress(
        &self,
        id: Uuid,
        progress: i32,
        stage: &str,
        message: &str,
    ) -> Result<()>;

    /// Terminal success transition. Returns `false` if already terminal.
    async fn complete(&self, id: Uuid, report: ClipReport) -> Result<bool>;

    /// Terminal failure transition. Returns `false` if already terminal.
    async fn fail(&self, id: Uuid, message: &str) -> Result<bool>;
}

/// Key-value persistence for batch records.
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Insert a batch record. Called before any sub-task is enqueued.
    async fn insert(&self, batch: Batch) -> Result<()>;

    /// Fetch a batch by id.
    async fn get(&self, id: Uuid) -> Result<Option<Batch>>;

    /// Record one sub-task terminal transition and return the updated record.
    /// The increment is delegated to the store so no read-modify-write race
    /// exists on the caller's side.
    async fn record_terminal(&self, id: Uuid, success: bool) -> Result<Batch>;
}

// =============================================================================
// ARTICLE DOCUMENT STORE
// =============================================================================

/// Document-oriented persistence for clipped articles, keyed by URL.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch the stored article for a URL, if any.
    async fn find_by_url(&self, url: &str) -> Result<Option<Article>>;

    /// Insert or overwrite the article for its URL. Returns `true` when a
    /// record already existed for the URL.
    async fn upsert(&self, article: Article) -> Result<bool>;

    /// Merge structured analysis fields into the stored article.
    async fn merge_fields(&self, url: &str, fields: JsonValue) -> Result<()>;
}

// =============================================================================
// TEXT ANALYSIS COLLABORATOR
// =============================================================================

/// Large-language-model text analysis.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    /// Analyze text and return structured fields as a JSON object.
    async fn analyze(&self, text: &str) -> Result<JsonValue>;
}
