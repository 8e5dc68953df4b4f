//! Conversions between domain and column types.

use leaderboard_core::error::DomainError;

pub(crate) fn db_error(error: sqlx::Error) -> DomainError {
    DomainError::Infrastructure(error.to_string())
}

pub(crate) fn to_bigint(value: u64, column: &str) -> Result<i64, DomainError> {
    i64::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("{column} {value} exceeds BIGINT")))
}

pub(crate) fn from_bigint(value: i64, column: &str) -> Result<u64, DomainError> {
    u64::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative {column} {value}")))
}

pub(crate) fn to_integer(value: u32, column: &str) -> Result<i32, DomainError> {
    i32::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("{column} {value} exceeds INTEGER")))
}

pub(crate) fn from_integer(value: i32, column: &str) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("negative {column} {value}")))
}

pub(crate) fn to_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}
