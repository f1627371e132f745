use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Shorthand for an `InvalidQuery` error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        AppError::InvalidQuery {
            message: message.into(),
        }
    }

    /// Shorthand for an `InvalidValue` error on a named field.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Short message safe to show to end users.
    ///
    /// Storage and internal failures are reduced to a generic message; the
    /// detailed text is available through `Display`.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound { entity, .. } => format!("{} not found", entity),
            AppError::InvalidQuery { .. } | AppError::InvalidValue { .. } => self.to_string(),
            AppError::StoreUnavailable { .. } => "Service temporarily unavailable".to_string(),
            AppError::Config { .. } | AppError::Internal { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("No row referenced by {column}: {id}")]
    MissingReference { column: &'static str, id: String },

    #[error("Corrupt {table} row {id}: {message}")]
    Corrupt {
        table: &'static str,
        id: String,
        message: String,
    },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Request boundary (JSON-RPC) errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Unknown method: {method}")]
    UnknownMethod { method: String },

    #[error("Invalid parameters for {method}: {message}")]
    InvalidParameters { method: String, message: String },

    #[error("Access denied: {message}")]
    Unauthorized { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Operation(#[from] AppError),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Corrupt { .. } => AppError::Internal {
                message: err.to_string(),
            },
            StorageError::MissingReference { column, id } => {
                AppError::invalid_value(column, format!("no record with id {}", id))
            }
            other => AppError::StoreUnavailable {
                message: other.to_string(),
            },
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::from(err).into()
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for request boundary operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
