use thiserror::Error;

/// Rejected process name, reported back to the caller as a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidProcessName {
    #[error("process name must not be empty")]
    Empty,

    #[error("process name is longer than {max} characters")]
    TooLong { max: usize },

    #[error("process name {0:?} contains control characters")]
    ControlCharacters(String),
}

/// A single process could not be read between enumeration and metric extraction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessQueryError {
    #[error("process {pid} exited before it could be sampled")]
    Vanished { pid: u32 },

    #[error("access denied while reading process {pid}")]
    AccessDenied { pid: u32 },
}
