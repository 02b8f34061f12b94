use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeadlineError {
    #[error("invalid orbit: {0}")]
    InvalidOrbit(String),

    #[error("body not in catalog: {0}")]
    UnknownBody(String),

    #[error("invalid body catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid rule: {0}")]
    InvalidRule(String),

    #[error("invalid title pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DeadlineError>;
