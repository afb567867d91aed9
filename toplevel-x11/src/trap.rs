//! Trapping protocol errors of requests that race with other clients.
//!
//! A query on a window that another client destroys in the meantime fails with `BadWindow`.
//! That is an expected outcome, not a failure of the connection, so [`trap`] turns it into a
//! [`ServerError::Protocol`] the caller can treat as "no answer".

use toplevel_core::error::{Remote, ServerError};
use tracing::debug;

use crate::error::X11Error;

/// Run `f`, separating protocol errors from connection errors.
///
/// Protocol errors are logged and returned as the inner error. Everything else is a broken
/// connection and propagates.
pub fn trap<T, F>(f: F) -> Result<Remote<T>, X11Error>
where
    F: FnOnce() -> Result<T, X11Error>,
{
    match f() {
        Ok(value) => Ok(Ok(value)),
        Err(X11Error::X11(error)) => {
            debug!(
                request = error.request_name.unwrap_or("unknown"),
                kind = ?error.error_kind,
                bad_value = error.bad_value,
                "trapped X11 error"
            );
            let (error_code, bad_value) = (error.error_code, error.bad_value);
            Ok(Err(ServerError::Protocol { error_code, bad_value }))
        },
        Err(other) => Err(other),
    }
}

/// Collapse a trapped result into a [`Remote`] one.
pub(crate) fn flatten<T>(result: Result<Remote<T>, X11Error>) -> Remote<T> {
    result.unwrap_or_else(|e| Err(e.into()))
}
