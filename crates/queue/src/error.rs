//! Queue error types.

use derive_more::{Display, Error};

/// A queue error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for queue operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    /// A persisted sequence state failed to round-trip through JSON.
    #[display("invalid queue state: {_0}")]
    InvalidState(#[error(not(source))] &'static str),
}
