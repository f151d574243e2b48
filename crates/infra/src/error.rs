use stockline_inventory::DeductionError;
use thiserror::Error;

/// Storage operation error.
///
/// `Deduction` carries the domain reason a write was refused; `Storage` is an
/// infrastructure failure (lock poisoning, database errors, bad rows).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Deduction(#[from] DeductionError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Map a sqlx error to a `StoreError`, tagging the failing operation.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            StoreError::Storage(format!(
                "database error in {} ({}): {}",
                operation,
                code,
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => StoreError::Storage(format!("connection pool closed in {}", operation)),
        sqlx::Error::RowNotFound => StoreError::Storage(format!("unexpected row not found in {}", operation)),
        _ => StoreError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}
