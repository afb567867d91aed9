//! An in-memory window system.
//!
//! [`HeadlessBackend`] implements [`WindowSystem`] without a display. It records every request,
//! keeps just enough window state to answer queries, and plays a window manager that answers
//! geometry requests with configure notifies. Notifies are queued, not delivered: call
//! [`HeadlessBackend::deliver`] or [`HeadlessBackend::settle`] to feed them to a [`Context`].
//!
//! The backend is a cheap handle: give one clone to the context and keep another to script
//! the screen and inspect what was sent.
//!
//! ```
//! use toplevel::headless::HeadlessBackend;
//! use toplevel::{Context, ContextAttributes, WindowAttributes};
//!
//! let backend = HeadlessBackend::new(1920, 1080);
//! let context = Context::new(backend.boxed(), ContextAttributes::default()).unwrap();
//! let window = context.create_window(WindowAttributes::default().with_default_size(300, 200));
//!
//! window.show();
//! backend.settle(&context).unwrap();
//! assert_eq!(window.size().width, 300);
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use dpi::{PhysicalPosition, PhysicalSize};
use smol_str::SmolStr;
use toplevel_core::backend::{
    NativeWindow, NativeWindowAttributes, PointerState, WindowKind, WindowSystem,
};
use toplevel_core::error::{OsError, Remote, RequestError, ServerError};
use toplevel_core::event::BackendEvent;
use toplevel_core::geometry::Rect;
use toplevel_core::hints::GeometryHints;
use toplevel_core::monitor::{MonitorSet, TopologyProbe};
use toplevel_core::os_error;
use toplevel_core::state::{ModifierType, WindowState};
use tracing::trace;

use crate::context::Context;

/// First id handed out, in the range X servers use for client resources.
const FIRST_WINDOW: u32 = 0x20_0001;

/// `BadWindow`.
const BAD_WINDOW: u8 = 3;

/// Upper bound of dispatch rounds in [`HeadlessBackend::settle`].
const SETTLE_ROUNDS: usize = 64;

/// A request received by the [`HeadlessBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Create { window: NativeWindow, attributes: NativeWindowAttributes },
    Destroy(NativeWindow),
    Show(NativeWindow),
    Focus { window: NativeWindow, timestamp: Option<u32> },
    Withdraw(NativeWindow),
    Move { window: NativeWindow, x: i32, y: i32 },
    Resize { window: NativeWindow, width: i32, height: i32 },
    MoveResize { window: NativeWindow, rect: Rect },
    SetHints { window: NativeWindow, hints: GeometryHints },
    SetTransientFor { window: NativeWindow, parent: Option<NativeWindow> },
    ChangeState { window: NativeWindow, state: WindowState, enable: bool },
    Freeze(NativeWindow),
    Thaw(NativeWindow),
    ConfigureFinished(NativeWindow),
    StartupComplete(Option<SmolStr>),
}

impl Recorded {
    /// Whether the request changes the geometry of a window.
    pub fn is_geometry(&self) -> bool {
        matches!(
            self,
            Recorded::Move { .. } | Recorded::Resize { .. } | Recorded::MoveResize { .. }
        )
    }
}

/// Decoration sizes reported as frame extents.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameInsets {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

#[derive(Debug)]
struct HeadlessWindow {
    kind: WindowKind,
    rect: Rect,
    mapped: bool,
    state: WindowState,
}

#[derive(Debug)]
struct HeadlessState {
    screen: Rect,
    work_area: Option<Rect>,
    monitors: Option<MonitorSet>,
    pointer: PhysicalPosition<i32>,
    pointer_same_screen: bool,
    frame: FrameInsets,
    configure_replies: bool,
    failing_queries: bool,
    next_window: u32,
    windows: BTreeMap<NativeWindow, HeadlessWindow>,
    requests: Vec<Recorded>,
    events: VecDeque<BackendEvent>,
}

impl HeadlessState {
    fn window_mut(&mut self, window: NativeWindow) -> Result<&mut HeadlessWindow, RequestError> {
        self.windows
            .get_mut(&window)
            .ok_or_else(|| os_error!(format!("unknown window {:#x}", window.raw())).into())
    }

    fn query(&self, window: NativeWindow) -> Remote<&HeadlessWindow> {
        match self.windows.get(&window) {
            Some(found) if !self.failing_queries => Ok(found),
            _ => Err(ServerError::Protocol { error_code: BAD_WINDOW, bad_value: window.raw() }),
        }
    }

    fn state_changed(&mut self, window: NativeWindow, old: WindowState, new: WindowState) {
        if old != new {
            self.events.push_back(BackendEvent::StateChanged { window, changed: old ^ new, new });
        }
    }

    /// Record a geometry change and let the window manager answer it.
    fn reconfigure(&mut self, window: NativeWindow, rect: Rect) -> Result<(), RequestError> {
        let replies = self.configure_replies;
        let target = self.window_mut(window)?;
        target.rect = rect;

        let popup = target.kind == WindowKind::Popup;
        if replies || popup {
            self.events.push_back(BackendEvent::Configure { window, rect });
        }
        Ok(())
    }
}

/// Answers topology discovery with the scripted monitors.
#[derive(Debug)]
struct ScriptedProbe(Option<MonitorSet>);

impl TopologyProbe for ScriptedProbe {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn try_discover(&self, _screen: &Rect) -> Option<MonitorSet> {
        self.0.clone()
    }
}

/// An in-memory [`WindowSystem`].
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessBackend {
    /// A screen of the given size with a single monitor and a window manager that answers
    /// every geometry request.
    pub fn new(width: i32, height: i32) -> Self {
        HeadlessBackend {
            state: Rc::new(RefCell::new(HeadlessState {
                screen: Rect::from_size(width, height),
                work_area: None,
                monitors: None,
                pointer: PhysicalPosition::new(width / 2, height / 2),
                pointer_same_screen: true,
                frame: FrameInsets::default(),
                configure_replies: true,
                failing_queries: false,
                next_window: FIRST_WINDOW,
                windows: BTreeMap::new(),
                requests: Vec::new(),
                events: VecDeque::new(),
            })),
        }
    }

    /// A handle to pass to [`Context::new`].
    pub fn boxed(&self) -> Box<dyn WindowSystem> {
        Box::new(self.clone())
    }

    /// Script the monitor layout. `None` leaves discovery to the single-monitor fallback.
    ///
    /// Takes effect on the next discovery; see [`HeadlessBackend::monitors_changed`].
    pub fn set_monitors(&self, monitors: Option<MonitorSet>) {
        self.state.borrow_mut().monitors = monitors;
    }

    /// Queue a [`BackendEvent::MonitorsChanged`].
    pub fn monitors_changed(&self) {
        self.push_event(BackendEvent::MonitorsChanged);
    }

    /// Resize the root window and queue a [`BackendEvent::ScreenSizeChanged`].
    pub fn set_screen_rect(&self, rect: Rect) {
        self.state.borrow_mut().screen = rect;
        self.push_event(BackendEvent::ScreenSizeChanged { rect });
    }

    pub fn set_work_area(&self, work_area: Option<Rect>) {
        self.state.borrow_mut().work_area = work_area;
    }

    /// Move the pointer, in root coordinates.
    pub fn set_pointer(&self, x: i32, y: i32) {
        self.state.borrow_mut().pointer = PhysicalPosition::new(x, y);
    }

    /// Put the pointer on another screen.
    pub fn set_pointer_same_screen(&self, same_screen: bool) {
        self.state.borrow_mut().pointer_same_screen = same_screen;
    }

    pub fn set_frame_insets(&self, frame: FrameInsets) {
        self.state.borrow_mut().frame = frame;
    }

    /// Whether the window manager answers geometry requests of managed windows.
    ///
    /// Turning this off simulates a session without a window manager.
    pub fn set_configure_replies(&self, replies: bool) {
        self.state.borrow_mut().configure_replies = replies;
    }

    /// Make every query fail as if its window had been destroyed.
    pub fn set_failing_queries(&self, failing: bool) {
        self.state.borrow_mut().failing_queries = failing;
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.borrow().requests.clone()
    }

    /// Every request received since the last call.
    pub fn take_requests(&self) -> Vec<Recorded> {
        std::mem::take(&mut self.state.borrow_mut().requests)
    }

    pub fn window_rect(&self, window: NativeWindow) -> Option<Rect> {
        self.state.borrow().windows.get(&window).map(|window| window.rect)
    }

    pub fn is_mapped(&self, window: NativeWindow) -> bool {
        self.state.borrow().windows.get(&window).is_some_and(|window| window.mapped)
    }

    pub fn window_count(&self) -> usize {
        self.state.borrow().windows.len()
    }

    /// Queue an event as if the window system had sent it.
    pub fn push_event(&self, event: BackendEvent) {
        self.state.borrow_mut().events.push_back(event);
    }

    /// Resize a window on behalf of the window manager, e.g. because the user dragged its
    /// border.
    pub fn configure(&self, window: NativeWindow, rect: Rect) {
        let mut state = self.state.borrow_mut();
        if let Some(target) = state.windows.get_mut(&window) {
            target.rect = rect;
        }
        state.events.push_back(BackendEvent::Configure { window, rect });
    }

    pub fn pending_events(&self) -> usize {
        self.state.borrow().events.len()
    }

    /// Feed the queued events to `context`. Returns how many were delivered.
    pub fn deliver(&self, context: &Context) -> usize {
        let mut delivered = 0;
        loop {
            // Handling an event calls back into the backend.
            let event = self.state.borrow_mut().events.pop_front();
            let Some(event) = event else {
                return delivered;
            };

            trace!(?event, "delivering headless event");
            context.handle_event(event);
            delivered += 1;
        }
    }

    /// Dispatch and deliver until neither produces more work.
    pub fn settle(&self, context: &Context) -> Result<(), OsError> {
        let mut quiet_rounds = 0;
        for _ in 0..SETTLE_ROUNDS {
            context.dispatch(Some(Duration::ZERO))?;
            if self.deliver(context) == 0 {
                quiet_rounds += 1;
                if quiet_rounds == 2 {
                    return Ok(());
                }
            } else {
                quiet_rounds = 0;
            }
        }

        Err(os_error!("headless window system did not settle"))
    }

    fn record(&self, request: Recorded) {
        self.state.borrow_mut().requests.push(request);
    }
}

impl WindowSystem for HeadlessBackend {
    fn create_window(
        &mut self,
        attributes: &NativeWindowAttributes,
    ) -> Result<NativeWindow, RequestError> {
        let mut state = self.state.borrow_mut();
        let window = NativeWindow(state.next_window);
        state.next_window += 1;

        state.windows.insert(window, HeadlessWindow {
            kind: attributes.kind,
            rect: attributes.rect,
            mapped: false,
            state: WindowState::WITHDRAWN,
        });
        state.requests.push(Recorded::Create { window, attributes: attributes.clone() });
        Ok(window)
    }

    fn destroy_window(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.record(Recorded::Destroy(window));
        let mut state = self.state.borrow_mut();
        state.windows.remove(&window);
        state.events.push_back(BackendEvent::Destroyed { window });
        Ok(())
    }

    fn show(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.record(Recorded::Show(window));
        let mut state = self.state.borrow_mut();
        let target = state.window_mut(window)?;
        target.mapped = true;
        let old = target.state;
        target.state.remove(WindowState::WITHDRAWN | WindowState::ICONIFIED);

        let new = target.state;
        state.events.push_back(BackendEvent::Map { window });
        state.state_changed(window, old, new);
        Ok(())
    }

    fn focus(&mut self, window: NativeWindow, timestamp: Option<u32>) -> Result<(), RequestError> {
        self.record(Recorded::Focus { window, timestamp });
        Ok(())
    }

    fn withdraw(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.record(Recorded::Withdraw(window));
        let mut state = self.state.borrow_mut();
        let target = state.window_mut(window)?;
        target.mapped = false;
        let old = target.state;
        target.state.insert(WindowState::WITHDRAWN);

        let new = target.state;
        state.events.push_back(BackendEvent::Unmap { window });
        state.state_changed(window, old, new);
        Ok(())
    }

    fn move_window(&mut self, window: NativeWindow, x: i32, y: i32) -> Result<(), RequestError> {
        self.record(Recorded::Move { window, x, y });
        let mut state = self.state.borrow_mut();
        let rect = Rect { x, y, ..state.window_mut(window)?.rect };
        state.reconfigure(window, rect)
    }

    fn resize(
        &mut self,
        window: NativeWindow,
        size: PhysicalSize<i32>,
    ) -> Result<(), RequestError> {
        let (width, height) = (size.width, size.height);
        self.record(Recorded::Resize { window, width, height });
        let mut state = self.state.borrow_mut();
        let rect = Rect { width, height, ..state.window_mut(window)?.rect };
        state.reconfigure(window, rect)
    }

    fn move_resize(&mut self, window: NativeWindow, rect: Rect) -> Result<(), RequestError> {
        self.record(Recorded::MoveResize { window, rect });
        self.state.borrow_mut().reconfigure(window, rect)
    }

    fn set_geometry_hints(
        &mut self,
        window: NativeWindow,
        hints: &GeometryHints,
    ) -> Result<(), RequestError> {
        self.record(Recorded::SetHints { window, hints: *hints });
        Ok(())
    }

    fn set_transient_for(
        &mut self,
        window: NativeWindow,
        parent: Option<NativeWindow>,
    ) -> Result<(), RequestError> {
        self.record(Recorded::SetTransientFor { window, parent });
        Ok(())
    }

    fn change_state(
        &mut self,
        window: NativeWindow,
        state: WindowState,
        enable: bool,
    ) -> Result<(), RequestError> {
        self.record(Recorded::ChangeState { window, state, enable });

        let mut headless = self.state.borrow_mut();
        let target = headless.window_mut(window)?;
        let old = target.state;
        target.state.set(state, enable);

        let new = target.state;
        headless.state_changed(window, old, new);
        Ok(())
    }

    fn freeze_updates(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.record(Recorded::Freeze(window));
        Ok(())
    }

    fn thaw_updates(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.record(Recorded::Thaw(window));
        Ok(())
    }

    fn configure_finished(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.record(Recorded::ConfigureFinished(window));
        Ok(())
    }

    fn query_pointer(&self, relative_to: Option<NativeWindow>) -> Remote<PointerState> {
        let state = self.state.borrow();
        let origin = match relative_to {
            Some(window) => state.query(window)?.rect.origin(),
            None if state.failing_queries => {
                return Err(ServerError::Protocol { error_code: BAD_WINDOW, bad_value: 0 });
            },
            None => PhysicalPosition::new(0, 0),
        };

        let root = state.pointer;
        Ok(PointerState {
            root: root.cast(),
            window: PhysicalPosition::new(root.x - origin.x, root.y - origin.y).cast(),
            mask: ModifierType::empty(),
            child: None,
            same_screen: state.pointer_same_screen,
        })
    }

    fn window_origin(&self, window: NativeWindow) -> Remote<PhysicalPosition<i32>> {
        Ok(self.state.borrow().query(window)?.rect.origin())
    }

    fn window_size(&self, window: NativeWindow) -> Remote<PhysicalSize<i32>> {
        Ok(self.state.borrow().query(window)?.rect.size())
    }

    fn frame_extents(&self, window: NativeWindow) -> Remote<Rect> {
        let state = self.state.borrow();
        let rect = state.query(window)?.rect;
        let frame = state.frame;
        Ok(Rect::new(
            rect.x - frame.left,
            rect.y - frame.top,
            rect.width + frame.left + frame.right,
            rect.height + frame.top + frame.bottom,
        ))
    }

    fn screen_rect(&self) -> Rect {
        self.state.borrow().screen
    }

    fn work_area(&self) -> Option<Rect> {
        self.state.borrow().work_area
    }

    fn topology_probes(&self) -> Vec<Box<dyn TopologyProbe + '_>> {
        vec![Box::new(ScriptedProbe(self.state.borrow().monitors.clone()))]
    }

    fn notify_startup_complete(&mut self, startup_id: Option<&str>) -> Result<(), RequestError> {
        self.record(Recorded::StartupComplete(startup_id.map(SmolStr::from)));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RequestError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use toplevel_core::monitor::Monitor;

    use super::*;

    #[test]
    fn managed_windows_are_answered_when_replies_are_on() {
        let mut backend = HeadlessBackend::new(800, 600);
        let window = backend
            .create_window(&NativeWindowAttributes {
                rect: Rect::from_size(100, 100),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(window, NativeWindow(FIRST_WINDOW));

        backend.resize(window, PhysicalSize::new(200, 150)).unwrap();
        assert_eq!(backend.pending_events(), 1);

        backend.set_configure_replies(false);
        backend.move_window(window, 10, 20).unwrap();
        assert_eq!(backend.pending_events(), 1);
        assert_eq!(backend.window_rect(window), Some(Rect::new(10, 20, 200, 150)));
    }

    #[test]
    fn popups_are_always_answered() {
        let mut backend = HeadlessBackend::new(800, 600);
        backend.set_configure_replies(false);
        let attributes = NativeWindowAttributes { kind: WindowKind::Popup, ..Default::default() };
        let popup = backend.create_window(&attributes).unwrap();

        backend.move_resize(popup, Rect::new(5, 5, 50, 50)).unwrap();
        assert_eq!(backend.pending_events(), 1);
    }

    #[test]
    fn failing_queries_look_like_destroyed_windows() {
        let mut backend = HeadlessBackend::new(800, 600);
        let window = backend.create_window(&NativeWindowAttributes::default()).unwrap();
        assert!(backend.window_size(window).is_ok());

        backend.set_failing_queries(true);
        let err = backend.window_size(window).unwrap_err();
        assert!(err.is_protocol());
        assert!(backend.query_pointer(None).is_err());
    }

    #[test]
    fn frame_extents_include_insets() {
        let mut backend = HeadlessBackend::new(800, 600);
        backend.set_frame_insets(FrameInsets { left: 2, right: 2, top: 20, bottom: 2 });
        let window = backend
            .create_window(&NativeWindowAttributes {
                rect: Rect::new(100, 100, 50, 40),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(backend.frame_extents(window).unwrap(), Rect::new(98, 80, 54, 62));
    }

    #[test]
    fn scripted_topology_is_probed() {
        let backend = HeadlessBackend::new(800, 600);
        let probes = backend.topology_probes();
        assert_eq!(probes[0].try_discover(&Rect::from_size(800, 600)), None);
        drop(probes);

        let monitors = MonitorSet::new(vec![Monitor::from_geometry(Rect::from_size(800, 600))]);
        backend.set_monitors(monitors.clone());
        assert_eq!(backend.topology_probes()[0].try_discover(&Rect::default()), monitors);
    }

    #[test]
    fn state_changes_are_reported() {
        let mut backend = HeadlessBackend::new(800, 600);
        let window = backend.create_window(&NativeWindowAttributes::default()).unwrap();
        backend.change_state(window, WindowState::MAXIMIZED, true).unwrap();
        backend.change_state(window, WindowState::MAXIMIZED, true).unwrap();

        assert_eq!(backend.pending_events(), 1);
        assert_eq!(backend.take_requests().len(), 3);
        assert!(backend.requests().is_empty());
    }
}
