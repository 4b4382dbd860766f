use thiserror::Error;

/// Why a received line could not become a `RawSample`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid-encoding")]
    InvalidEncoding,
    #[error("field-count-mismatch")]
    FieldCountMismatch,
    #[error("field-type-mismatch")]
    FieldTypeMismatch,
}

#[derive(Debug, Error, Clone)]
pub enum PipelineError {
    #[error("link error: {0}")]
    Link(String),
    #[error("counter store has no file configured")]
    StoreUnconfigured,
    #[error("counter file {path}: {reason}")]
    Store { path: String, reason: String },
    #[error("counter {name} cannot hold {value}")]
    NonFiniteCounter { name: String, value: f64 },
    #[error("invalid state: {0}")]
    State(String),
}

impl PipelineError {
    /// Flatten a transport error and its causes into a `Link` error.
    pub fn link(e: &(dyn std::error::Error + 'static)) -> Self {
        let mut msg = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        PipelineError::Link(msg)
    }
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
