use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    InvalidUri(String),
    UnsupportedScheme(String),
    EmptyIdentifier,
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidUri(msg) => write!(f, "invalid uri: {msg}"),
            ModelError::UnsupportedScheme(scheme) => {
                write!(f, "unsupported scheme: {scheme}")
            }
            ModelError::EmptyIdentifier => {
                write!(f, "identifier cannot be empty")
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<url::ParseError> for ModelError {
    fn from(err: url::ParseError) -> Self {
        ModelError::InvalidUri(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
