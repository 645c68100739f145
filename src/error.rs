use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Backend,
    Timeout,
    Validation,
    Infra,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },
    #[error("job '{job_id}' did not finish within {waited_secs}s")]
    Timeout { job_id: String, waited_secs: u64 },
    #[error("invalid asset specification: {0}")]
    Validation(String),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Backend { .. } => ErrorKind::Backend,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Io(_) => ErrorKind::Infra,
        }
    }

    /// Fatal errors abort an orchestration call before any task starts.
    /// Everything else is absorbed at the task boundary.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Configuration | ErrorKind::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_task_scoped_like_backend_errors() {
        let timeout = GenerationError::Timeout {
            job_id: String::from("job-1"),
            waited_secs: 600,
        };
        let backend = GenerationError::backend("stability", "HTTP 500");

        assert!(!timeout.is_fatal());
        assert!(!backend.is_fatal());
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(
            backend.to_string(),
            "backend 'stability' failed: HTTP 500"
        );
    }

    #[test]
    fn configuration_and_validation_are_fatal() {
        assert!(GenerationError::Configuration(String::from("no video backend")).is_fatal());
        assert!(GenerationError::Validation(String::from("missing description")).is_fatal());
    }
}
