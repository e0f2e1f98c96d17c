use thiserror::Error;

use vantage_model::ModuleId;

/// Failures surfaced by a request engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("request aborted")]
    Aborted,

    #[error("response exceeded {limit_kb} KB cap")]
    ResponseTooLarge { limit_kb: u32 },

    #[error("request engine error: {0}")]
    Engine(String),
}

/// Failures surfaced by a crawler run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrawlError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("crawler failed: {0}")]
    Failed(String),
}

/// Failures surfaced by a single module invocation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("module {module} failed: {reason}")]
    Failed { module: ModuleId, reason: String },
}

impl ModuleError {
    pub fn failed(module: &ModuleId, reason: impl Into<String>) -> Self {
        ModuleError::Failed {
            module: module.clone(),
            reason: reason.into(),
        }
    }
}
