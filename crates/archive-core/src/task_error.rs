//! Errors returned by background job handlers.
//!
//! The worker inspects a failed job's error to decide between retrying it and
//! giving up. Plain `anyhow` errors count as recoverable.

use std::fmt;

#[derive(Debug)]
pub struct TaskError {
    inner: anyhow::Error,
    recoverable: bool,
}

impl TaskError {
    /// The job failed permanently; retrying would produce the same result
    /// (unknown file id, malformed payload).
    pub fn unrecoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            recoverable: false,
        }
    }

    /// The job may succeed later (source blob not yet visible, database hiccup).
    pub fn recoverable(err: impl Into<anyhow::Error>) -> Self {
        Self {
            inner: err.into(),
            recoverable: true,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<anyhow::Error> for TaskError {
    fn from(err: anyhow::Error) -> Self {
        Self::recoverable(err)
    }
}

/// Mark a failing result as not worth retrying.
pub trait TaskResultExt<T> {
    fn unrecoverable(self) -> Result<T, TaskError>;
}

impl<T, E: Into<anyhow::Error>> TaskResultExt<T> for Result<T, E> {
    fn unrecoverable(self) -> Result<T, TaskError> {
        self.map_err(|e| TaskError::unrecoverable(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecoverable_is_not_retried() {
        let err = TaskError::unrecoverable(anyhow::anyhow!("record file not found"));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("record file not found"));
    }

    #[test]
    fn anyhow_converts_to_recoverable() {
        let err: TaskError = anyhow::anyhow!("source blob missing").into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn result_ext_marks_unrecoverable() {
        let result: Result<(), anyhow::Error> = Err(anyhow::anyhow!("bad payload"));
        let err = result.unrecoverable().unwrap_err();
        assert!(!err.is_recoverable());
    }

    #[test]
    fn survives_round_trip_through_anyhow() {
        let err: anyhow::Error = TaskError::unrecoverable(anyhow::anyhow!("gone")).into();
        let task_err = err.downcast_ref::<TaskError>().expect("downcast");
        assert!(!task_err.is_recoverable());
    }
}
