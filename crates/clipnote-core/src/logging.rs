//! Structured logging field name constants for clipnote.
//!
//! All crates use these constants for consistent structured logging fields so
//! log aggregation tools can query by standardized names across subsystems.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, task completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-token/per-filter iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "jobs", "tracker"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "submit", "dispatch", "render", "navigate"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Task UUID being processed.
pub const TASK_ID: &str = "task_id";

/// Batch UUID a task belongs to.
pub const BATCH_ID: &str = "batch_id";

/// URL being clipped.
pub const URL: &str = "url";

/// Name of the template chosen for a URL.
pub const TEMPLATE: &str = "template";

/// Pipeline stage currently executing.
pub const STAGE: &str = "stage";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Navigation attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

/// Byte length of extracted content.
pub const CONTENT_LEN: &str = "content_len";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
