use thiserror::Error;

/// Problems with the session settings, caught before a session starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("minimum image duration must be greater than zero")]
    ZeroMinimumDuration,
    #[error("session budget of {total}s is shorter than the {minimum}s minimum per image")]
    BudgetBelowMinimum { total: u32, minimum: u32 },
}

/// Errors surfaced by the session clock. None of them change clock state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no images loaded, load some images before starting")]
    NoImagesLoaded,
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("prompt must be at least {minimum} characters long")]
    PromptTooShort { minimum: usize },
    #[error("image generation failed: {0}")]
    Failed(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("history record could not be encoded: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("history export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type HistoryResult<T> = std::result::Result<T, HistoryError>;
