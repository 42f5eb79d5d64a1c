// sqlx::Error -> AppError mapping

use taskq_core::error::AppError;

/// Every sqlx failure is a store error; the code is kept for the logs
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some(code) if code.as_ref() == "5" => {
                AppError::Store(format!("Database locked (SQLITE_BUSY): {}", db_err.message()))
            }
            Some(code) if code.as_ref() == "13" => {
                AppError::Store(format!("Database full: {}", db_err.message()))
            }
            Some(code) => AppError::Store(format!(
                "Database error [{}]: {}",
                code.as_ref(),
                db_err.message()
            )),
            None => AppError::Store(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::PoolTimedOut => AppError::Store("Connection pool timed out".to_string()),
        // Connection, pool, protocol errors
        _ => AppError::Store(err.to_string()),
    }
}
