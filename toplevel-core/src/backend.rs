//! The contract between the toolkit and a window system.
//!
//! A [`WindowSystem`] carries out requests on opaque [`NativeWindow`] handles and answers
//! queries. Requests are fire-and-forget: the window system reports their effect later through
//! [`BackendEvent`](crate::event::BackendEvent)s, if at all. Queries may race with the
//! destruction of the window they target and therefore return a [`Remote`] result.

use dpi::{PhysicalPosition, PhysicalSize};
use smol_str::SmolStr;

use crate::error::{Remote, RequestError};
use crate::geometry::Rect;
use crate::hints::GeometryHints;
use crate::monitor::TopologyProbe;
use crate::state::{ModifierType, WindowState};

/// Opaque handle of a native window, e.g. an X11 window id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeWindow(pub u32);

impl NativeWindow {
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// How the window manager treats a window.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// A managed window, placed and decorated by the window manager.
    #[default]
    Toplevel,
    /// An override-redirect window; the window manager never sees its requests.
    Popup,
}

/// Parameters for creating a native window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeWindowAttributes {
    pub kind: WindowKind,
    /// Initial geometry. The window manager may ignore the position.
    pub rect: Rect,
    pub title: Option<SmolStr>,
    pub transient_for: Option<NativeWindow>,
}

/// Snapshot of the pointer as seen from a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    /// Position relative to the root window.
    pub root: PhysicalPosition<f64>,
    /// Position relative to the queried window.
    pub window: PhysicalPosition<f64>,
    pub mask: ModifierType,
    /// The child of the queried window containing the pointer.
    pub child: Option<NativeWindow>,
    /// Whether the pointer is on the same screen as the queried window.
    pub same_screen: bool,
}

impl PointerState {
    /// Root position truncated to whole pixels.
    pub fn root_position(&self) -> PhysicalPosition<i32> {
        self.root.cast()
    }
}

/// A window system able to host toplevel windows.
pub trait WindowSystem {
    fn create_window(
        &mut self,
        attributes: &NativeWindowAttributes,
    ) -> Result<NativeWindow, RequestError>;

    fn destroy_window(&mut self, window: NativeWindow) -> Result<(), RequestError>;

    /// Map the window.
    fn show(&mut self, window: NativeWindow) -> Result<(), RequestError>;

    /// Raise the window and ask for input focus.
    ///
    /// `timestamp` is the user interaction time the request stems from, if known.
    fn focus(&mut self, window: NativeWindow, timestamp: Option<u32>) -> Result<(), RequestError>;

    /// Unmap the window and tell the window manager to forget it.
    fn withdraw(&mut self, window: NativeWindow) -> Result<(), RequestError>;

    fn move_window(&mut self, window: NativeWindow, x: i32, y: i32) -> Result<(), RequestError>;

    fn resize(
        &mut self,
        window: NativeWindow,
        size: PhysicalSize<i32>,
    ) -> Result<(), RequestError>;

    fn move_resize(&mut self, window: NativeWindow, rect: Rect) -> Result<(), RequestError>;

    fn set_geometry_hints(
        &mut self,
        window: NativeWindow,
        hints: &GeometryHints,
    ) -> Result<(), RequestError>;

    fn set_transient_for(
        &mut self,
        window: NativeWindow,
        parent: Option<NativeWindow>,
    ) -> Result<(), RequestError>;

    /// Ask the window manager to add or remove a state, e.g. [`WindowState::MAXIMIZED`].
    fn change_state(
        &mut self,
        window: NativeWindow,
        state: WindowState,
        enable: bool,
    ) -> Result<(), RequestError>;

    /// Stop presenting new content until [`WindowSystem::thaw_updates`].
    fn freeze_updates(&mut self, window: NativeWindow) -> Result<(), RequestError>;

    fn thaw_updates(&mut self, window: NativeWindow) -> Result<(), RequestError>;

    /// Acknowledge that the latest configure has been handled.
    fn configure_finished(&mut self, window: NativeWindow) -> Result<(), RequestError>;

    /// Query the pointer relative to `relative_to`, or to the root window when `None`.
    fn query_pointer(&self, relative_to: Option<NativeWindow>) -> Remote<PointerState>;

    /// Position of the window's client area in root coordinates.
    fn window_origin(&self, window: NativeWindow) -> Remote<PhysicalPosition<i32>>;

    /// Size of the window's client area as last known by the window system.
    fn window_size(&self, window: NativeWindow) -> Remote<PhysicalSize<i32>>;

    /// The window including decorations, in root coordinates.
    fn frame_extents(&self, window: NativeWindow) -> Remote<Rect>;

    /// The whole screen in root coordinates.
    fn screen_rect(&self) -> Rect;

    /// The area not reserved by panels and docks, if the window manager publishes one.
    fn work_area(&self) -> Option<Rect>;

    /// Probes to discover the monitor layout, most specific first.
    fn topology_probes(&self) -> Vec<Box<dyn TopologyProbe + '_>>;

    /// Tell the launcher that startup has finished.
    ///
    /// `None` completes the sequence the process was launched with.
    fn notify_startup_complete(&mut self, startup_id: Option<&str>) -> Result<(), RequestError>;

    fn flush(&mut self) -> Result<(), RequestError>;
}
