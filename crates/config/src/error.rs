//! Configuration error types.

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The file or environment providers produced something that does not
    /// deserialize into the configuration shape.
    #[display("could not read configuration")]
    Read,
    /// The configuration deserialized fine but fails a semantic check.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] &'static str),
}
