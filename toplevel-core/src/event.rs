//! Events reported by the window system.

use crate::backend::NativeWindow;
use crate::geometry::Rect;
use crate::state::WindowState;

/// An event delivered by a [`WindowSystem`](crate::backend::WindowSystem).
///
/// Events for one window arrive in the order the window system produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// The window's geometry changed, or the window manager confirms a request.
    Configure { window: NativeWindow, rect: Rect },

    Map { window: NativeWindow },

    Unmap { window: NativeWindow },

    /// The window manager changed the state of a window.
    StateChanged { window: NativeWindow, changed: WindowState, new: WindowState },

    /// Outputs were added, removed or reconfigured.
    MonitorsChanged,

    /// The root window was resized.
    ScreenSizeChanged { rect: Rect },

    /// The user asked to close the window.
    DeleteRequest { window: NativeWindow },

    Destroyed { window: NativeWindow },
}

impl BackendEvent {
    /// The window the event is addressed to, `None` for screen events.
    pub fn window(&self) -> Option<NativeWindow> {
        match *self {
            BackendEvent::Configure { window, .. }
            | BackendEvent::Map { window }
            | BackendEvent::Unmap { window }
            | BackendEvent::StateChanged { window, .. }
            | BackendEvent::DeleteRequest { window }
            | BackendEvent::Destroyed { window } => Some(window),
            BackendEvent::MonitorsChanged | BackendEvent::ScreenSizeChanged { .. } => None,
        }
    }
}
