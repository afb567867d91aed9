//! Common error types.

use std::{error, fmt};

/// Construct an [`OsError`] tagged with the current source location.
#[macro_export]
macro_rules! os_error {
    ($error:expr) => {{
        $crate::error::OsError::new(line!(), file!(), $error)
    }};
}

/// The error type for when a backend request could not be carried out.
#[derive(Debug)]
pub enum RequestError {
    /// The request is not supported by the backend.
    NotSupported(NotSupportedError),
    /// The request was ignored by the window system.
    Ignored,
    /// An error from the underlying window system.
    Os(OsError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NotSupported(err) => err.fmt(f),
            RequestError::Ignored => write!(f, "The request was ignored"),
            RequestError::Os(err) => err.fmt(f),
        }
    }
}

impl error::Error for RequestError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RequestError::NotSupported(err) => Some(err),
            RequestError::Os(err) => Some(err),
            RequestError::Ignored => None,
        }
    }
}

impl From<NotSupportedError> for RequestError {
    fn from(value: NotSupportedError) -> Self {
        Self::NotSupported(value)
    }
}

impl From<OsError> for RequestError {
    fn from(value: OsError) -> Self {
        Self::Os(value)
    }
}

/// The error type for when the requested operation is not supported by the backend.
#[derive(Clone)]
pub struct NotSupportedError {
    reason: &'static str,
}

impl NotSupportedError {
    /// Create a new [`NotSupportedError`].
    #[inline]
    pub fn new(reason: &'static str) -> NotSupportedError {
        NotSupportedError { reason }
    }
}

impl fmt::Debug for NotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotSupportedError").field("reason", &self.reason).finish()
    }
}

impl fmt::Display for NotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation not supported by the backend: {}", self.reason)
    }
}

impl error::Error for NotSupportedError {}

/// The error type for when the OS cannot perform the requested operation.
#[derive(Debug)]
pub struct OsError {
    line: u32,
    file: &'static str,
    error: Box<dyn error::Error + Send + Sync + 'static>,
}

impl OsError {
    #[allow(dead_code)]
    pub fn new(
        line: u32,
        file: &'static str,
        error: impl Into<Box<dyn error::Error + Send + Sync + 'static>>,
    ) -> Self {
        Self { line, file, error: error.into() }
    }
}

impl fmt::Display for OsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("os error at {}:{}: {}", self.file, self.line, self.error))
    }
}

impl error::Error for OsError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// A remote query that the window system answered with an error.
///
/// Protocol errors are the expected outcome of racing a query against the destruction of the
/// queried resource. Callers treat them as "no answer" and carry on.
#[derive(Debug)]
pub enum ServerError {
    /// The server rejected the request.
    Protocol {
        /// The protocol error code.
        error_code: u8,
        /// The offending resource or value.
        bad_value: u32,
    },
    /// The connection itself failed.
    Connection(OsError),
}

impl ServerError {
    /// Whether this error is a rejected request rather than a broken connection.
    pub fn is_protocol(&self) -> bool {
        matches!(self, ServerError::Protocol { .. })
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Protocol { error_code, bad_value } => {
                write!(f, "server error {error_code} for resource {bad_value:#x}")
            },
            ServerError::Connection(err) => write!(f, "connection error: {err}"),
        }
    }
}

impl error::Error for ServerError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ServerError::Connection(err) => Some(err),
            ServerError::Protocol { .. } => None,
        }
    }
}

impl From<OsError> for ServerError {
    fn from(value: OsError) -> Self {
        ServerError::Connection(value)
    }
}

/// Result of a query that may race with the window system.
pub type Remote<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    #![allow(clippy::redundant_clone)]

    use super::*;

    // Eat attributes for testing
    #[test]
    fn ensure_fmt_does_not_panic() {
        let _ = format!(
            "{:?}, {}",
            NotSupportedError::new("test"),
            NotSupportedError::new("test").clone()
        );
        let _ = format!(
            "{:?}, {}",
            RequestError::Ignored,
            ServerError::Protocol { error_code: 3, bad_value: 0x400001 }
        );
    }

    #[test]
    fn os_error_keeps_source() {
        let err = os_error!("broken pipe");
        assert!(error::Error::source(&err).is_some());
        assert!(err.to_string().contains("broken pipe"));

        let server = ServerError::from(err);
        assert!(!server.is_protocol());
        assert!(error::Error::source(&server).is_some());
    }
}
