//! Error types for clipnote.

use thiserror::Error;

/// Result type alias using clipnote's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for clipnote operations.
///
/// Note that source/filter resolution inside the template engine never
/// produces an `Error`: resolution is total and degrades to empty values.
/// These variants cover the failures that *do* surface, all of which end a
/// task with a terminal `failed` status.
#[derive(Error, Debug)]
pub enum Error {
    /// Template configuration is malformed beyond repair
    #[error("Template error: {0}")]
    Template(String),

    /// Template rendering failed
    #[error("Render error: {0}")]
    Render(String),

    /// Page navigation/network failure (after retries are exhausted)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Task or article persistence failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Text-analysis collaborator failed
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Scheduler/queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Task not found
    #[error("Task not found: {0}")]
    TaskNotFound(uuid::Uuid),

    /// Batch not found
    #[error("Batch not found: {0}")]
    BatchNotFound(uuid::Uuid),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_fetch() {
        let err = Error::Fetch("navigation timed out".to_string());
        assert_eq!(err.to_string(), "Fetch error: navigation timed out");
    }

    #[test]
    fn test_error_display_render() {
        let err = Error::Render("bad format string".to_string());
        assert_eq!(err.to_string(), "Render error: bad format string");
    }

    #[test]
    fn test_error_display_task_not_found() {
        let id = Uuid::nil();
        let err = Error::TaskNotFound(id);
        assert_eq!(err.to_string(), format!("Task not found: {}", id));
    }

    #[test]
    fn test_error_display_batch_not_found() {
        let id = Uuid::new_v4();
        let err = Error::BatchNotFound(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_analysis() {
        let err = Error::Analysis("upstream 429".to_string());
        assert_eq!(err.to_string(), "Analysis error: upstream 429");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
