use thiserror::Error;
use vantage_contracts::TransportError;

/// Synchronous failures reported to callers of the scan control surface.
///
/// Everything that goes wrong after the executor has launched is absorbed
/// and logged instead; see [`crate::scan::ScanReport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("scanner is locked by another scan")]
    LockedState,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl ScanError {
    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        ScanError::InvalidState(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
