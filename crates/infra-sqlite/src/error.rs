// sqlx::Error -> AppError

use jobharvest_core::error::AppError;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            // SQLite result codes: https://www.sqlite.org/rescode.html
            Some(code) if code.as_ref() == "5" => {
                AppError::Storage(format!("Database locked (SQLITE_BUSY): {}", db_err.message()))
            }
            Some(code) if code.as_ref() == "13" => {
                AppError::Storage(format!("Database full: {}", db_err.message()))
            }
            Some(code) => AppError::Storage(format!(
                "Database error [{}]: {}",
                code.as_ref(),
                db_err.message()
            )),
            None => AppError::Storage(format!("Database error: {}", db_err.message())),
        },
        sqlx::Error::RowNotFound => AppError::Storage("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => AppError::Storage(format!("Column not found: {}", col)),
        // Connection, pool, protocol errors
        _ => AppError::Storage(err.to_string()),
    }
}
