// sqlx::Error -> AppError mapping

use lwgs_core::error::AppError;

// SQLITE_CONSTRAINT_PRIMARYKEY and SQLITE_CONSTRAINT_UNIQUE extended
// result codes; the one case consumers must be able to tell apart
const KEY_CLASH_CODES: [&str; 2] = ["1555", "2067"];

/// Convert sqlx errors to AppError. A clash on a unique or primary key
/// becomes the distinguishable `DataIntegrityViolation` that redelivery
/// and lazy-creation races dispatch on; everything else is an opaque
/// database error.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            Some(code) if KEY_CLASH_CODES.contains(&code) => {
                AppError::DataIntegrityViolation(format!(
                    "duplicate key ({}): {}",
                    code,
                    db_err.message()
                ))
            }
            Some(code) => {
                AppError::Database(format!("sqlite error {}: {}", code, db_err.message()))
            }
            None => AppError::Database(db_err.message().to_string()),
        },
        other => AppError::Database(other.to_string()),
    }
}
