use shared::{domain::TitleCode, error::ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {key} already exists")]
    DuplicateKey { entity: &'static str, key: String },

    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },

    #[error("part {number} of title {code} is outside 1..={max}")]
    PartOutOfRange {
        code: TitleCode,
        number: u32,
        max: i64,
    },

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn duplicate(entity: &'static str, key: impl ToString) -> Self {
        Self::DuplicateKey {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Maps unique-constraint violations onto `DuplicateKey`.
    pub(crate) fn from_insert(error: sqlx::Error, entity: &'static str, key: impl ToString) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::duplicate(entity, key),
            _ => Self::Database(error),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateKey { .. } => ErrorCode::Conflict,
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::PartOutOfRange { .. } | Self::InvalidBackup(_) => ErrorCode::Validation,
            Self::Database(_) | Self::Migrate(_) | Self::Io(_) | Self::Json(_) => {
                ErrorCode::Internal
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
