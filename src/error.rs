use thiserror::Error;

#[derive(Debug, Error)]
pub enum DBError {
    #[error(transparent)]
    SQLError(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid ISO timestamp format: {0}")]
    MalformedTimestamp(String),
    #[error("Failed serializing observation payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Cannot specify both 'days' and 'count' parameters. Choose one.")]
    AmbiguousFilter,
    #[error("Days must be between 1 and {0}")]
    DaysOutOfRange(i64),
    #[error("Count must be between 1 and {0}")]
    CountOutOfRange(i64),
    #[error("Both 'from' and 'to' parameters must be provided together for date range filtering")]
    HalfOpenRange,
    #[error("Invalid ISO timestamp format: {0}")]
    MalformedInstant(String),
    #[error("'from' date must be before 'to' date")]
    InvertedRange,
}

/// Classified error surface of the core services. The REST layer maps
/// `Validation`/`Ingestion` to 400, `NotFound` to 404 and `Internal` to 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] DBError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Internal(DBError::SQLError(err))
    }
}
