use thiserror::Error;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Dataset source not found: {0}")]
    MissingSource(String),

    #[error("Dataset {source_name} is missing required column '{column}'")]
    MissingColumn { source_name: String, column: String },

    #[error("Dataset {source_name} has a malformed '{column}' value at row {row}")]
    MalformedValue {
        source_name: String,
        column: String,
        row: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for QaError {
    fn from(err: polars::error::PolarsError) -> Self {
        QaError::Polars(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, QaError>;
