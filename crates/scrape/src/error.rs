//! Scrape error types.

use derive_more::{Display, Error};

/// A scrape error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scrape operations.
pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong between asking for a page and having its record stored.
///
/// The distinction that matters to callers is backend health: backend errors
/// feed the scheduler's pacing, everything else is a local problem.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[display("connection reset by backend")]
    ConnectionReset,
    #[display("connection refused by backend")]
    ConnectionRefused,
    #[display("backend timed out")]
    Timeout,
    #[display("response carried no content")]
    NoContent,
    #[display("unexpected status code {_0}")]
    Status(#[error(not(source))] u16),
    #[display("extraction failed")]
    Extract,
    #[display("persistence error")]
    Persistence,
}

impl ErrorKind {
    /// Transport-level failure: the backend never produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionReset | Self::ConnectionRefused | Self::Timeout
        )
    }

    /// Whether the error says anything about backend health. These slow the
    /// crawl down; a malformed document does not.
    pub fn is_backend_error(&self) -> bool {
        self.is_transport() || matches!(self, Self::NoContent | Self::Status(_))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::ErrorKind;

    #[rstest]
    #[case(ErrorKind::ConnectionReset, true)]
    #[case(ErrorKind::ConnectionRefused, true)]
    #[case(ErrorKind::Timeout, true)]
    #[case(ErrorKind::NoContent, true)]
    #[case(ErrorKind::Status(503), true)]
    #[case(ErrorKind::Extract, false)]
    #[case(ErrorKind::Persistence, false)]
    fn backend_errors_drive_pacing(#[case] kind: ErrorKind, #[case] expected: bool) {
        assert_eq!(kind.is_backend_error(), expected);
    }
}
