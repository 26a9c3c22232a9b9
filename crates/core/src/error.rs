use thiserror::Error;

#[derive(Error, Debug)]
pub enum StylescopeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Parsing error: {0}")]
    Parsing(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ignore::Error> for StylescopeError {
    fn from(err: ignore::Error) -> Self {
        StylescopeError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StylescopeError>;
