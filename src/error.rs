use postgres::error::SqlState;

/// Error type for the pg-converge crate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Postgres(#[from] postgres::Error),
    #[error("{0}")]
    Generic(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Self::Generic(value)
    }
}

// Manual PartialEq implementation because postgres::Error doesn't implement PartialEq
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Postgres(a), Self::Postgres(b)) => a.to_string() == b.to_string(),
            (Self::Generic(a), Self::Generic(b)) => a == b,
            _ => false,
        }
    }
}

/// True when the server rejected a statement with SQLSTATE 23505 (unique_violation).
///
/// This is the only failure class the constraint retrofit path tolerates; every
/// other SQLSTATE propagates as a fatal error.
pub(crate) fn is_unique_violation(error: &postgres::Error) -> bool {
    error.code() == Some(&SqlState::UNIQUE_VIOLATION)
}
