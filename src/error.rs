use thiserror::Error;

/// Rejections raised before any job state exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no items to recognize")]
    EmptyInput,
    #[error("a recognition job is already running")]
    AlreadyRunning,
    #[error("recognition service not ready (ocr_configured={ocr}, llm_configured={llm})")]
    NotReady { ocr: bool, llm: bool },
    #[error("max batch size must be at least 1, got {0}")]
    InvalidBatchSize(usize),
}

/// Failure of a single batch call. The display text becomes the per-item error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("{0}")]
    Transport(String),
    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("remote returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("invalid response body: {0}")]
    Decode(String),
    #[error("recognizer returned {got} results for {expected} items")]
    Protocol { expected: usize, got: usize },
}
