//! Error types for the payment gateway broker.

use rust_decimal::Decimal;

use crate::domain::TransactionStatus;

/// Domain-level errors (business rule violations).
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },
}

/// Repository-level errors (data access failures).
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Externally visible failure class.
///
/// Every [`AppError`] maps to exactly one kind and every kind to exactly one
/// status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Unauthorized,
    NotFound,
    InvalidTransition,
    InsufficientFunds,
    Gateway,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status class for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidTransition => 409,
            ErrorKind::InsufficientFunds => 422,
            ErrorKind::Gateway => 502,
            ErrorKind::Internal => 500,
        }
    }
}

/// Application-level errors returned by the core operations.
///
/// Maps cleanly to HTTP status codes through [`AppError::kind`].
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient funds.")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error("{0}")]
    Gateway(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Transaction cannot move from {from} to {to}")]
    InvalidTransition {
        from: TransactionStatus,
        to: TransactionStatus,
    },

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            AppError::Gateway(_) => ErrorKind::Gateway,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::InvalidTransition { from, to } => AppError::InvalidTransition { from, to },
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Domain(e) => e.into(),
            RepoError::NotFound => AppError::NotFound("Transaction not found".into()),
            RepoError::Database(e) => AppError::Internal(e),
            RepoError::Conflict(e) => AppError::Internal(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_is_total() {
        let cases = [
            (AppError::Validation("x".into()), 400),
            (AppError::Unauthorized("x".into()), 401),
            (AppError::NotFound("x".into()), 404),
            (
                AppError::InvalidTransition {
                    from: TransactionStatus::Completed,
                    to: TransactionStatus::Pending,
                },
                409,
            ),
            (
                AppError::InsufficientFunds {
                    available: Decimal::ONE,
                    requested: Decimal::TEN,
                },
                422,
            ),
            (AppError::Gateway("x".into()), 502),
            (AppError::Internal("x".into()), 500),
        ];

        for (err, code) in cases {
            assert_eq!(err.status_code(), code, "{err:?}");
        }
    }

    #[test]
    fn test_repo_error_conversion() {
        let err: AppError = RepoError::Database("connection reset".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let err: AppError = RepoError::NotFound.into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: AppError = RepoError::Domain(DomainError::Validation("bad".into())).into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
