use thiserror::Error;
use weft_ai::AiError;

/// Orchestration-level failures. Resolution errors are misconfiguration
/// and abort the turn before any session state is touched.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("context not found: {0}")]
    ContextNotFound(String),

    #[error("strategy not found: {0}")]
    StrategyNotFound(String),

    #[error("unknown directive: {0}")]
    UnknownDirective(String),

    #[error("directive '{name}' failed: {reason}")]
    DirectiveFailed { name: String, reason: String },

    #[error(transparent)]
    Vendor(#[from] AiError),

    #[error("store failure: {0}")]
    Store(String),
}

impl EngineError {
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}
