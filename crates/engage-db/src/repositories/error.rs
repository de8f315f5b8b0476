//! Error handling utilities for repositories

use engage_core::error::DomainError;
use sqlx::Error as SqlxError;

/// SQLSTATE codes worth retrying: serialization failure, deadlock,
/// admin shutdown, cannot connect now
const TRANSIENT_SQLSTATES: [&str; 4] = ["40001", "40P01", "57P01", "57P03"];

/// Convert SQLx error to DomainError
///
/// Connection-level failures are transient; everything else is permanent.
pub fn map_db_error(e: SqlxError) -> DomainError {
    let transient = match &e {
        SqlxError::PoolTimedOut
        | SqlxError::PoolClosed
        | SqlxError::Io(_)
        | SqlxError::Tls(_)
        | SqlxError::WorkerCrashed => true,
        SqlxError::Database(db_err) => db_err
            .code()
            .is_some_and(|code| TRANSIENT_SQLSTATES.contains(&code.as_ref())),
        _ => false,
    };

    if transient {
        DomainError::Unavailable(e.to_string())
    } else {
        DomainError::Storage(e.to_string())
    }
}
