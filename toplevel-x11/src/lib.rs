//! # X11
//!
//! The X11 [`WindowSystem`](toplevel_core::backend::WindowSystem) for `toplevel`, written
//! against [`x11rb`].
//!
//! Monitors are discovered through RandR 1.3 with a Xinerama fallback, window state follows
//! EWMH and pointer queries go through XInput2 when the server has it. Queries that may race
//! with another client destroying a window are run through [`trap`], which turns protocol
//! errors into a [`ServerError`](toplevel_core::error::ServerError) instead of failing.
//!
//! Connections through an untrusted SECURITY context may not look at windows of other
//! clients. [`XI2Device`] answers pointer queries for them with throwaway probe windows.

macro_rules! os_error {
    ($error:expr) => {{
        toplevel_core::error::OsError::new(line!(), file!(), $error)
    }};
}

mod atoms;
mod backend;
mod device;
mod error;
mod event;
mod hints;
mod monitor;
mod startup;
mod state;
mod trap;
mod xdisplay;

pub use crate::backend::X11Backend;
pub use crate::device::{
    translate_event_mask, translate_state, DeviceConnection, GrabStatus, RawPointer,
    WindowAtPosition, XI2Device, VIRTUAL_CORE_POINTER,
};
pub use crate::error::X11Error;
pub use crate::hints::normal_hints;
pub use crate::monitor::{
    randr_monitor_set, select_primary, xinerama_monitor_set, OutputInfo, RandR13Probe,
    XineramaProbe,
};
pub use crate::startup::{message_chunks, remove_message};
pub use crate::state::{StateAtoms, StateOperation};
pub use crate::trap::trap;
pub use crate::xdisplay::XConnection;
