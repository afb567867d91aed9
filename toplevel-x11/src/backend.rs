use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::env;
use std::rc::Rc;

use dpi::{PhysicalPosition, PhysicalSize};
use toplevel_core::backend::{
    NativeWindow, NativeWindowAttributes, PointerState, WindowKind, WindowSystem,
};
use toplevel_core::error::{NotSupportedError, Remote, RequestError};
use toplevel_core::event::BackendEvent;
use toplevel_core::geometry::Rect;
use toplevel_core::hints::GeometryHints;
use toplevel_core::monitor::TopologyProbe;
use toplevel_core::state::{ModifierType, WindowState};
use tracing::{debug, trace};
use x11rb::connection::Connection as _;
use x11rb::properties::{WmHints, WmHintsState};
use x11rb::protocol::sync::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::wrapper::ConnectionExt as _;

use crate::device::{WindowAtPosition, XI2Device, VIRTUAL_CORE_POINTER};
use crate::error::X11Error;
use crate::hints::normal_hints;
use crate::monitor::{RandR13Probe, XineramaProbe};
use crate::startup;
use crate::state::{StateAtoms, StateOperation};
use crate::trap::{flatten, trap};
use crate::xdisplay::XConnection;

/// Environment variable a launcher passes the startup id in.
const STARTUP_ID_ENV: &str = "DESKTOP_STARTUP_ID";

/// `_NET_WM_STATE` source indication for normal applications.
const SOURCE_APPLICATION: u32 = 1;

/// `IconicState` for `WM_CHANGE_STATE`.
const ICONIC_STATE: u32 = 3;

/// Events selected on every window the backend creates.
fn client_event_mask() -> xproto::EventMask {
    xproto::EventMask::STRUCTURE_NOTIFY
        | xproto::EventMask::PROPERTY_CHANGE
        | xproto::EventMask::FOCUS_CHANGE
}

/// What the backend remembers about one of its windows.
#[derive(Debug)]
pub(crate) struct WindowRecord {
    pub kind: WindowKind,
    /// Whether the window was shown and not withdrawn since.
    pub mapped: bool,
    /// The state last reported by the server.
    pub state: WindowState,
    /// States requested while unmapped, applied when the window is shown.
    pub desired: WindowState,
    pub sync_counter: Option<sync::Counter>,
    /// Value of the last `_NET_WM_SYNC_REQUEST` not yet acknowledged.
    pub sync_value: Option<u64>,
    pub frozen: bool,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub xconn: XConnection,
    pub state_atoms: StateAtoms,
    pub windows: RefCell<HashMap<xproto::Window, WindowRecord>>,
    pub startup_id: RefCell<Option<String>>,
    pub events: RefCell<VecDeque<BackendEvent>>,
}

impl Shared {
    pub(crate) fn push_event(&self, event: BackendEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub(crate) fn is_known(&self, window: xproto::Window) -> bool {
        self.windows.borrow().contains_key(&window)
    }

    fn with_record<R>(
        &self,
        window: NativeWindow,
        f: impl FnOnce(&mut WindowRecord) -> R,
    ) -> Result<R, X11Error> {
        let mut windows = self.windows.borrow_mut();
        let record = windows.get_mut(&window.raw()).ok_or(X11Error::UnknownWindow(window.raw()))?;
        Ok(f(record))
    }

    fn create_window(&self, attributes: &NativeWindowAttributes) -> Result<NativeWindow, X11Error> {
        let conn = self.xconn.xcb_connection();
        let atoms = self.xconn.atoms();
        let popup = attributes.kind == WindowKind::Popup;
        let rect = attributes.rect;

        let window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            self.xconn.root(),
            clamp_coordinate(rect.x),
            clamp_coordinate(rect.y),
            clamp_extent(rect.width) as u16,
            clamp_extent(rect.height) as u16,
            0,
            xproto::WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &xproto::CreateWindowAux::new()
                .event_mask(client_event_mask())
                .override_redirect(u32::from(popup)),
        )?;

        let mut sync_counter = None;
        if !popup {
            let mut protocols = vec![atoms.WM_DELETE_WINDOW];
            if self.xconn.extensions().sync {
                let counter = conn.generate_id()?;
                conn.sync_create_counter(counter, sync::Int64 { hi: 0, lo: 0 })?;
                conn.change_property32(
                    xproto::PropMode::REPLACE,
                    window,
                    atoms._NET_WM_SYNC_REQUEST_COUNTER,
                    xproto::AtomEnum::CARDINAL,
                    &[counter],
                )?;
                protocols.push(atoms._NET_WM_SYNC_REQUEST);
                sync_counter = Some(counter);
            }

            conn.change_property32(
                xproto::PropMode::REPLACE,
                window,
                atoms.WM_PROTOCOLS,
                xproto::AtomEnum::ATOM,
                &protocols,
            )?;
        }

        if let Some(title) = &attributes.title {
            conn.change_property8(
                xproto::PropMode::REPLACE,
                window,
                atoms._NET_WM_NAME,
                atoms.UTF8_STRING,
                title.as_bytes(),
            )?;
            conn.change_property8(
                xproto::PropMode::REPLACE,
                window,
                xproto::AtomEnum::WM_NAME,
                xproto::AtomEnum::STRING,
                title.as_bytes(),
            )?;
        }

        if let Some(parent) = attributes.transient_for {
            self.set_transient_for(window, Some(parent))?;
        }

        self.windows.borrow_mut().insert(window, WindowRecord {
            kind: attributes.kind,
            mapped: false,
            state: WindowState::WITHDRAWN,
            desired: WindowState::empty(),
            sync_counter,
            sync_value: None,
            frozen: false,
        });

        debug!(window, ?rect, popup, "created X11 window");
        Ok(NativeWindow(window))
    }

    fn destroy_window(&self, window: NativeWindow) -> Result<(), X11Error> {
        let conn = self.xconn.xcb_connection();
        let counter = self.with_record(window, |record| record.sync_counter.take())?;
        if let Some(counter) = counter {
            conn.sync_destroy_counter(counter)?;
        }

        // The record goes away with the DestroyNotify.
        conn.destroy_window(window.raw())?;
        Ok(())
    }

    fn show(&self, window: NativeWindow) -> Result<(), X11Error> {
        let (kind, desired) = self.with_record(window, |record| {
            record.mapped = true;
            (record.kind, record.desired)
        })?;

        if kind == WindowKind::Toplevel {
            let mut hints = WmHints::new();
            hints.input = Some(true);
            hints.initial_state = Some(if desired.contains(WindowState::ICONIFIED) {
                WmHintsState::Iconic
            } else {
                WmHintsState::Normal
            });
            hints.set(self.xconn.xcb_connection(), window.raw())?;
        }

        self.xconn.xcb_connection().map_window(window.raw())?;
        Ok(())
    }

    fn focus(&self, window: NativeWindow, timestamp: Option<u32>) -> Result<(), X11Error> {
        let time = timestamp.unwrap_or(x11rb::CURRENT_TIME);
        self.xconn.xcb_connection().configure_window(
            window.raw(),
            &xproto::ConfigureWindowAux::new().stack_mode(xproto::StackMode::ABOVE),
        )?;
        self.xconn.send_wm_msg(
            window.raw(),
            self.xconn.atoms()._NET_ACTIVE_WINDOW,
            [SOURCE_APPLICATION, time, 0, 0, 0],
        )
    }

    /// Withdraw as ICCCM describes it: unmap, then tell the window manager through a synthetic
    /// `UnmapNotify`.
    fn withdraw(&self, window: NativeWindow) -> Result<(), X11Error> {
        let kind = self.with_record(window, |record| {
            record.mapped = false;
            record.kind
        })?;

        let conn = self.xconn.xcb_connection();
        conn.unmap_window(window.raw())?;

        if kind == WindowKind::Toplevel {
            let root = self.xconn.root();
            conn.send_event(
                false,
                root,
                xproto::EventMask::SUBSTRUCTURE_REDIRECT | xproto::EventMask::SUBSTRUCTURE_NOTIFY,
                &withdrawal_notice(root, window.raw()),
            )?;
        }

        Ok(())
    }

    fn configure(
        &self,
        window: NativeWindow,
        aux: &xproto::ConfigureWindowAux,
    ) -> Result<(), X11Error> {
        self.xconn.xcb_connection().configure_window(window.raw(), aux)?;
        Ok(())
    }

    fn set_geometry_hints(
        &self,
        window: NativeWindow,
        hints: &GeometryHints,
    ) -> Result<(), X11Error> {
        normal_hints(hints).set_normal_hints(self.xconn.xcb_connection(), window.raw())?;
        Ok(())
    }

    fn set_transient_for(
        &self,
        window: xproto::Window,
        parent: Option<NativeWindow>,
    ) -> Result<(), X11Error> {
        let conn = self.xconn.xcb_connection();
        match parent {
            Some(parent) => conn.change_property32(
                xproto::PropMode::REPLACE,
                window,
                xproto::AtomEnum::WM_TRANSIENT_FOR,
                xproto::AtomEnum::WINDOW,
                &[parent.raw()],
            )?,
            None => conn.delete_property(window, u32::from(xproto::AtomEnum::WM_TRANSIENT_FOR))?,
        };
        Ok(())
    }

    fn change_state(
        &self,
        window: NativeWindow,
        state: WindowState,
        enable: bool,
    ) -> Result<(), X11Error> {
        let atoms = self.xconn.atoms();
        let (mapped, desired) = self.with_record(window, |record| {
            if !record.mapped {
                record.desired.set(state, enable);
            }
            (record.mapped, record.desired)
        })?;

        if state == WindowState::ICONIFIED {
            if mapped && enable {
                let data = [ICONIC_STATE, 0, 0, 0, 0];
                self.xconn.send_wm_msg(window.raw(), atoms.WM_CHANGE_STATE, data)?;
            } else if mapped {
                self.xconn.xcb_connection().map_window(window.raw())?;
            }
            return Ok(());
        }

        let Some((first, second)) = self.state_atoms.request(state) else {
            return Ok(());
        };

        if mapped {
            let operation = StateOperation::from(enable) as u32;
            let data = [operation, first, second, SOURCE_APPLICATION, 0];
            self.xconn.send_wm_msg(window.raw(), atoms._NET_WM_STATE, data)
        } else {
            self.xconn.xcb_connection().change_property32(
                xproto::PropMode::REPLACE,
                window.raw(),
                atoms._NET_WM_STATE,
                xproto::AtomEnum::ATOM,
                &self.state_atoms.encode(desired),
            )?;
            Ok(())
        }
    }

    fn configure_finished(&self, window: NativeWindow) -> Result<(), X11Error> {
        let pending = self.with_record(window, |record| {
            record.sync_counter.zip(record.sync_value.take())
        })?;

        if let Some((counter, value)) = pending {
            trace!(window = window.raw(), value, "acknowledging sync request");
            let value = sync::Int64 { hi: (value >> 32) as i32, lo: value as u32 };
            self.xconn.xcb_connection().sync_set_counter(counter, value)?;
        }
        Ok(())
    }

    fn query_pointer(&self, window: xproto::Window) -> Result<Remote<PointerState>, X11Error> {
        if self.xconn.has_xinput2() {
            let device = XI2Device::new(&self.xconn, VIRTUAL_CORE_POINTER);
            return device.query_state(NativeWindow(window));
        }

        let conn = self.xconn.xcb_connection();
        trap(|| {
            let reply = conn.query_pointer(window)?.reply()?;
            Ok(PointerState {
                root: PhysicalPosition::new(reply.root_x.into(), reply.root_y.into()),
                window: PhysicalPosition::new(reply.win_x.into(), reply.win_y.into()),
                mask: ModifierType::from_bits_retain(u16::from(reply.mask).into()),
                child: (reply.child != x11rb::NONE).then_some(NativeWindow(reply.child)),
                same_screen: reply.same_screen,
            })
        })
    }

    fn window_origin(
        &self,
        window: NativeWindow,
    ) -> Result<Remote<PhysicalPosition<i32>>, X11Error> {
        let conn = self.xconn.xcb_connection();
        trap(|| {
            let reply =
                conn.translate_coordinates(window.raw(), self.xconn.root(), 0, 0)?.reply()?;
            Ok(PhysicalPosition::new(reply.dst_x.into(), reply.dst_y.into()))
        })
    }

    fn window_size(&self, window: NativeWindow) -> Result<Remote<PhysicalSize<i32>>, X11Error> {
        let conn = self.xconn.xcb_connection();
        trap(|| {
            let geometry = conn.get_geometry(window.raw())?.reply()?;
            Ok(PhysicalSize::new(geometry.width.into(), geometry.height.into()))
        })
    }

    fn frame_extents(&self, window: NativeWindow) -> Result<Remote<Rect>, X11Error> {
        let origin = match self.window_origin(window)? {
            Ok(origin) => origin,
            Err(err) => return Ok(Err(err)),
        };
        let size = match self.window_size(window)? {
            Ok(size) => size,
            Err(err) => return Ok(Err(err)),
        };

        let atoms = self.xconn.atoms();
        let extents = trap(|| {
            self.xconn.get_property32(
                window.raw(),
                atoms._NET_FRAME_EXTENTS,
                xproto::AtomEnum::CARDINAL,
            )
        })?;

        // Left, right, top, bottom. Undecorated windows have none.
        let (left, right, top, bottom) = match extents.as_deref() {
            Ok(&[left, right, top, bottom, ..]) => {
                (left as i32, right as i32, top as i32, bottom as i32)
            },
            _ => (0, 0, 0, 0),
        };

        Ok(Ok(Rect::new(
            origin.x - left,
            origin.y - top,
            size.width + left + right,
            size.height + top + bottom,
        )))
    }

    fn work_area(&self) -> Result<Option<Rect>, X11Error> {
        let values = self.xconn.get_property32(
            self.xconn.root(),
            self.xconn.atoms()._NET_WORKAREA,
            xproto::AtomEnum::CARDINAL,
        )?;

        // One rectangle per desktop; the first one is used.
        Ok(match values[..] {
            [x, y, width, height, ..] => {
                Some(Rect::new(x as i32, y as i32, width as i32, height as i32))
            },
            _ => None,
        })
    }

    fn notify_startup_complete(&self, startup_id: Option<&str>) -> Result<(), X11Error> {
        let id = match startup_id {
            Some(id) => Some(id.to_owned()),
            None => self.startup_id.borrow_mut().take(),
        };

        match id {
            Some(id) => {
                debug!(id, "completing startup notification");
                startup::broadcast(&self.xconn, &startup::remove_message(&id))
            },
            None => Ok(()),
        }
    }
}

/// Coordinates are 16 bit on the wire.
fn clamp_coordinate(value: i32) -> i16 {
    value.clamp(i16::MIN.into(), i16::MAX.into()) as i16
}

/// Sizes are 16 bit on the wire and may not be zero.
fn clamp_extent(value: i32) -> u32 {
    value.clamp(1, u16::MAX.into()) as u32
}

/// A [`WindowSystem`] backed by an X server.
///
/// The backend is a cheap handle: pass one clone to the toolkit with [`X11Backend::boxed`] and
/// keep another to pump events.
///
/// ```no_run
/// use toplevel_x11::X11Backend;
///
/// let backend = X11Backend::connect(None)?;
/// while let Some(event) = backend.poll_event()? {
///     println!("{event:?}");
/// }
/// # Ok::<(), toplevel_x11::X11Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct X11Backend {
    shared: Rc<Shared>,
}

impl X11Backend {
    /// Connect to `display_name`, or to `$DISPLAY` when `None`.
    ///
    /// The startup id the process was launched with is taken from `DESKTOP_STARTUP_ID`, which
    /// is then removed from the environment so children do not inherit it.
    pub fn connect(display_name: Option<&str>) -> Result<Self, X11Error> {
        let xconn = XConnection::new(display_name)?;

        let startup_id = env::var(STARTUP_ID_ENV).ok().filter(|id| !id.is_empty());
        if startup_id.is_some() {
            env::remove_var(STARTUP_ID_ENV);
        }

        let state_atoms = StateAtoms::new(xconn.atoms());
        Ok(X11Backend {
            shared: Rc::new(Shared {
                xconn,
                state_atoms,
                windows: RefCell::new(HashMap::new()),
                startup_id: RefCell::new(startup_id),
                events: RefCell::new(VecDeque::new()),
            }),
        })
    }

    /// A handle to hand to the toolkit.
    pub fn boxed(&self) -> Box<dyn WindowSystem> {
        Box::new(self.clone())
    }

    #[inline]
    pub fn xconn(&self) -> &XConnection {
        &self.shared.xconn
    }

    /// The next translated event, if one is available without blocking.
    pub fn poll_event(&self) -> Result<Option<BackendEvent>, X11Error> {
        loop {
            if let Some(event) = self.shared.events.borrow_mut().pop_front() {
                return Ok(Some(event));
            }

            match self.xconn().xcb_connection().poll_for_event()? {
                Some(event) => self.shared.process_event(event)?,
                None => return Ok(None),
            }
        }
    }

    /// The next translated event, blocking until the server sends one.
    pub fn wait_for_event(&self) -> Result<BackendEvent, X11Error> {
        loop {
            if let Some(event) = self.shared.events.borrow_mut().pop_front() {
                return Ok(event);
            }

            let event = self.xconn().xcb_connection().wait_for_event()?;
            self.shared.process_event(event)?;
        }
    }

    /// Hand every pending event to `handler`. Returns how many there were.
    ///
    /// The handler may call back into the backend.
    pub fn dispatch_pending(
        &self,
        mut handler: impl FnMut(BackendEvent),
    ) -> Result<usize, X11Error> {
        let mut dispatched = 0;
        while let Some(event) = self.poll_event()? {
            handler(event);
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// The core pointer.
    pub fn pointer(&self) -> XI2Device<'_, XConnection> {
        XI2Device::new(self.xconn(), VIRTUAL_CORE_POINTER)
    }

    /// The window of this client under the core pointer.
    pub fn window_at_pointer(&self, get_toplevel: bool) -> Result<WindowAtPosition, X11Error> {
        let toplevels: Vec<_> = self
            .shared
            .windows
            .borrow()
            .iter()
            .filter(|(_, record)| record.kind == WindowKind::Toplevel)
            .map(|(&window, _)| NativeWindow(window))
            .collect();

        self.pointer().window_at_position(
            &toplevels,
            |window| self.shared.is_known(window.raw()),
            get_toplevel,
        )
    }

    /// Whether updates of `window` are frozen.
    pub fn is_frozen(&self, window: NativeWindow) -> bool {
        self.shared.windows.borrow().get(&window.raw()).is_some_and(|record| record.frozen)
    }

    fn set_frozen(&self, window: NativeWindow, frozen: bool) -> Result<(), RequestError> {
        self.shared.with_record(window, |record| record.frozen = frozen)?;
        trace!(window = window.raw(), frozen, "updates frozen");
        Ok(())
    }
}

impl WindowSystem for X11Backend {
    fn create_window(
        &mut self,
        attributes: &NativeWindowAttributes,
    ) -> Result<NativeWindow, RequestError> {
        Ok(self.shared.create_window(attributes)?)
    }

    fn destroy_window(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        Ok(self.shared.destroy_window(window)?)
    }

    fn show(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        Ok(self.shared.show(window)?)
    }

    fn focus(&mut self, window: NativeWindow, timestamp: Option<u32>) -> Result<(), RequestError> {
        Ok(self.shared.focus(window, timestamp)?)
    }

    fn withdraw(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        Ok(self.shared.withdraw(window)?)
    }

    fn move_window(&mut self, window: NativeWindow, x: i32, y: i32) -> Result<(), RequestError> {
        let aux = xproto::ConfigureWindowAux::new().x(x).y(y);
        Ok(self.shared.configure(window, &aux)?)
    }

    fn resize(
        &mut self,
        window: NativeWindow,
        size: PhysicalSize<i32>,
    ) -> Result<(), RequestError> {
        let aux = xproto::ConfigureWindowAux::new()
            .width(clamp_extent(size.width))
            .height(clamp_extent(size.height));
        Ok(self.shared.configure(window, &aux)?)
    }

    fn move_resize(&mut self, window: NativeWindow, rect: Rect) -> Result<(), RequestError> {
        let aux = xproto::ConfigureWindowAux::new()
            .x(rect.x)
            .y(rect.y)
            .width(clamp_extent(rect.width))
            .height(clamp_extent(rect.height));
        Ok(self.shared.configure(window, &aux)?)
    }

    fn set_geometry_hints(
        &mut self,
        window: NativeWindow,
        hints: &GeometryHints,
    ) -> Result<(), RequestError> {
        Ok(self.shared.set_geometry_hints(window, hints)?)
    }

    fn set_transient_for(
        &mut self,
        window: NativeWindow,
        parent: Option<NativeWindow>,
    ) -> Result<(), RequestError> {
        Ok(self.shared.set_transient_for(window.raw(), parent)?)
    }

    fn change_state(
        &mut self,
        window: NativeWindow,
        state: WindowState,
        enable: bool,
    ) -> Result<(), RequestError> {
        if state != WindowState::ICONIFIED && self.shared.state_atoms.request(state).is_none() {
            return Err(NotSupportedError::new("state is owned by the window manager").into());
        }
        Ok(self.shared.change_state(window, state, enable)?)
    }

    fn freeze_updates(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.set_frozen(window, true)
    }

    fn thaw_updates(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        self.set_frozen(window, false)
    }

    fn configure_finished(&mut self, window: NativeWindow) -> Result<(), RequestError> {
        Ok(self.shared.configure_finished(window)?)
    }

    fn query_pointer(&self, relative_to: Option<NativeWindow>) -> Remote<PointerState> {
        let window = relative_to.map_or(self.xconn().root(), NativeWindow::raw);
        flatten(self.shared.query_pointer(window))
    }

    fn window_origin(&self, window: NativeWindow) -> Remote<PhysicalPosition<i32>> {
        flatten(self.shared.window_origin(window))
    }

    fn window_size(&self, window: NativeWindow) -> Remote<PhysicalSize<i32>> {
        flatten(self.shared.window_size(window))
    }

    fn frame_extents(&self, window: NativeWindow) -> Remote<Rect> {
        flatten(self.shared.frame_extents(window))
    }

    fn screen_rect(&self) -> Rect {
        self.xconn().screen_rect()
    }

    fn work_area(&self) -> Option<Rect> {
        self.shared.work_area().unwrap_or_else(|err| {
            debug!("_NET_WORKAREA query failed: {err}");
            None
        })
    }

    fn topology_probes(&self) -> Vec<Box<dyn TopologyProbe + '_>> {
        vec![Box::new(RandR13Probe::new(self.xconn())), Box::new(XineramaProbe::new(self.xconn()))]
    }

    fn notify_startup_complete(&mut self, startup_id: Option<&str>) -> Result<(), RequestError> {
        Ok(self.shared.notify_startup_complete(startup_id)?)
    }

    fn flush(&mut self) -> Result<(), RequestError> {
        self.xconn().xcb_connection().flush().map_err(X11Error::from)?;
        Ok(())
    }
}

/// The synthetic `UnmapNotify` telling the window manager that `window` is withdrawn.
fn withdrawal_notice(root: xproto::Window, window: xproto::Window) -> xproto::UnmapNotifyEvent {
    xproto::UnmapNotifyEvent {
        response_type: xproto::UNMAP_NOTIFY_EVENT,
        sequence: 0,
        event: root,
        window,
        from_configure: false,
    }
}
