use std::fmt;

use toplevel_core::error::{RequestError, ServerError};
use x11rb::errors::{ConnectError, ConnectionError, IdsExhausted, ReplyError, ReplyOrIdError};
use x11rb::x11_utils::X11Error as LogicalError;

/// Generic sum error type for X11 errors.
#[derive(Debug)]
pub enum X11Error {
    /// An error that occurred while trying to connect to the X server.
    Connect(ConnectError),

    /// An error that occurred over the connection medium.
    Connection(ConnectionError),

    /// An error that occurred logically on the X11 end.
    X11(LogicalError),

    /// The XID range has been exhausted.
    XidsExhausted(IdsExhausted),

    /// An extension that we rely on is not available.
    MissingExtension(&'static str),

    /// The display has no screen with this number.
    InvalidScreen(usize),

    /// The window is not one of ours.
    UnknownWindow(u32),
}

impl X11Error {
    /// The protocol error, if the server rejected a request.
    pub fn as_protocol(&self) -> Option<&LogicalError> {
        match self {
            X11Error::X11(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for X11Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            X11Error::Connect(e) => write!(f, "X11 connection error: {e}"),
            X11Error::Connection(e) => write!(f, "X11 connection error: {e}"),
            X11Error::XidsExhausted(e) => write!(f, "XID range exhausted: {e}"),
            X11Error::X11(e) => write!(f, "X11 error: {e:?}"),
            X11Error::MissingExtension(s) => write!(f, "Missing X11 extension: {s}"),
            X11Error::InvalidScreen(screen) => write!(f, "No such X11 screen: {screen}"),
            X11Error::UnknownWindow(window) => write!(f, "Unknown window {window:#x}"),
        }
    }
}

impl std::error::Error for X11Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            X11Error::Connect(e) => Some(e),
            X11Error::Connection(e) => Some(e),
            X11Error::XidsExhausted(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConnectError> for X11Error {
    fn from(e: ConnectError) -> Self {
        X11Error::Connect(e)
    }
}

impl From<ConnectionError> for X11Error {
    fn from(e: ConnectionError) -> Self {
        X11Error::Connection(e)
    }
}

impl From<LogicalError> for X11Error {
    fn from(e: LogicalError) -> Self {
        X11Error::X11(e)
    }
}

impl From<ReplyError> for X11Error {
    fn from(value: ReplyError) -> Self {
        match value {
            ReplyError::ConnectionError(e) => e.into(),
            ReplyError::X11Error(e) => e.into(),
        }
    }
}

impl From<ReplyOrIdError> for X11Error {
    fn from(value: ReplyOrIdError) -> Self {
        match value {
            ReplyOrIdError::ConnectionError(e) => e.into(),
            ReplyOrIdError::X11Error(e) => e.into(),
            ReplyOrIdError::IdsExhausted => Self::XidsExhausted(IdsExhausted),
        }
    }
}

impl From<X11Error> for RequestError {
    fn from(value: X11Error) -> Self {
        RequestError::Os(os_error!(value))
    }
}

impl From<X11Error> for ServerError {
    fn from(value: X11Error) -> Self {
        match value {
            X11Error::X11(e) => {
                ServerError::Protocol { error_code: e.error_code, bad_value: e.bad_value }
            },
            other => ServerError::Connection(os_error!(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_extension_is_displayed() {
        let err = X11Error::MissingExtension("RANDR");
        assert_eq!(err.to_string(), "Missing X11 extension: RANDR");
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn connection_errors_are_not_protocol_errors() {
        let err = X11Error::from(ConnectionError::UnknownError);
        assert!(err.as_protocol().is_none());

        let server = ServerError::from(err);
        assert!(!server.is_protocol());
    }

    #[test]
    fn exhausted_ids_keep_their_source() {
        let err = X11Error::from(ReplyOrIdError::IdsExhausted);
        assert!(matches!(err, X11Error::XidsExhausted(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(matches!(RequestError::from(err), RequestError::Os(_)));
    }
}
