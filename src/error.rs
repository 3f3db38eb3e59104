use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Reference data error at line {line}: {reason}")]
    ReferenceData { line: usize, reason: String },

    #[error("Address parser failed: {0}")]
    Parser(String),

    #[error("Nonsense classifier failed: {0}")]
    Classifier(String),

    #[error("City arbitration failed: {0}")]
    Arbitration(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
