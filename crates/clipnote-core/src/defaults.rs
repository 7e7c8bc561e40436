//! Centralized default constants for the clipnote system.
//!
//! **This module is the single source of truth** for all shared default
//! values. Crates reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// SCHEDULER
// =============================================================================

/// Maximum tasks executing concurrently.
pub const TASK_MAX_CONCURRENT: usize = 3;

/// Polling interval for the scheduler loop when idle (milliseconds).
pub const TASK_POLL_INTERVAL_MS: u64 = 500;

/// Hard ceiling on one task body's wall-clock time (seconds).
pub const TASK_TIMEOUT_SECS: u64 = 600;

/// Broadcast channel capacity for scheduler events.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// PAGE FETCH
// =============================================================================

/// Navigation attempts before the fetch is declared failed.
pub const FETCH_MAX_RETRIES: u32 = 3;

/// Timeout for the first navigation attempt (milliseconds).
pub const FETCH_BASE_TIMEOUT_MS: u64 = 60_000;

/// Added to the timeout on each subsequent attempt (60s, 90s, 120s).
pub const FETCH_TIMEOUT_STEP_MS: u64 = 30_000;

/// Timeout when waiting for a template-derived selector (milliseconds).
/// A wait failure is non-fatal.
pub const SELECTOR_WAIT_TIMEOUT_MS: u64 = 10_000;

/// Settle delay after navigation and selector wait, letting dynamic content
/// finish rendering (milliseconds).
pub const SETTLE_DELAY_MS: u64 = 3_000;

// =============================================================================
// CONTENT EXTRACTION
// =============================================================================

/// Extraction results shorter than this (while the page clearly had HTML)
/// trigger the whole-document conversion fallback.
pub const EXTRACTION_MIN_CHARS: usize = 50;

/// Maximum characters of note content handed to the text analyzer.
pub const ANALYSIS_MAX_CHARS: usize = 30_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_ladder() {
        // 60s, 90s, 120s across the three attempts
        let attempts: Vec<u64> = (0..FETCH_MAX_RETRIES as u64)
            .map(|i| FETCH_BASE_TIMEOUT_MS + i * FETCH_TIMEOUT_STEP_MS)
            .collect();
        assert_eq!(attempts, vec![60_000, 90_000, 120_000]);
    }

    #[test]
    fn test_concurrency_positive() {
        assert!(TASK_MAX_CONCURRENT >= 1);
    }
}
