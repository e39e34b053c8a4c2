use std::fmt;

/// Failures surfaced by the directory layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Network-level failure: connect, timeout, reset, unreadable body.
    Transport(String),
    /// The API answered with a non-success status.
    Http {
        status: u16,
        method: &'static str,
        path: String,
        body: String,
    },
    /// Every attempt allowed by the retry policy failed with a transient error.
    RetriesExhausted {
        attempts: u32,
        last: Box<DirectoryError>,
    },
    /// A response payload could not be decoded.
    Decode(String),
    /// Client construction failed (bad base URL, TLS setup, ...).
    Config(String),
}

impl DirectoryError {
    /// HTTP status behind this error, looking through retry exhaustion.
    pub fn status(&self) -> Option<u16> {
        match self {
            DirectoryError::Http { status, .. } => Some(*status),
            DirectoryError::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Transport failures, 5xx and 429 are transient. Every other 4xx points at
    /// a defect in the request and is not retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::Transport(_) => true,
            DirectoryError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Transport(msg) => write!(f, "transport error: {msg}"),
            DirectoryError::Http {
                status,
                method,
                path,
                body,
            } => {
                if body.is_empty() {
                    write!(f, "directory {method} {path} -> {status}")
                } else {
                    write!(f, "directory {method} {path} -> {status}: {body}")
                }
            }
            DirectoryError::RetriesExhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempt(s): {last}")
            }
            DirectoryError::Decode(msg) => write!(f, "decode error: {msg}"),
            DirectoryError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for DirectoryError {}
