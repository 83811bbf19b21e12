// sqlx::Error -> AppError classification
//
// Implemented as free functions: orphan rules forbid From<sqlx::Error> for AppError here.

use batchdesk_core::error::AppError;

/// Errors that mean "no usable connection" rather than "bad statement"
fn is_acquisition(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed
    )
}

/// Classify a failed statement or row mapping
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    if is_acquisition(&err) {
        return AppError::Acquisition(err.to_string());
    }

    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite extended result codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Query(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "787" | "3850" => AppError::Query(format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "5" => AppError::Query(format!(
                        "Database locked (SQLITE_BUSY): {}",
                        db_err.message()
                    )),
                    "13" => AppError::Query(format!("Database full: {}", db_err.message())),
                    _ => AppError::Query(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Query(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Query("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Query(format!("Column not found: {}", col)),
        _ => AppError::Query(err.to_string()),
    }
}

/// Classify a failed BEGIN / COMMIT / ROLLBACK
pub fn map_tx_error(err: sqlx::Error) -> AppError {
    if is_acquisition(&err) {
        AppError::Acquisition(err.to_string())
    } else {
        AppError::Transaction(err.to_string())
    }
}
