//! XInput2 pointer devices.
//!
//! [`XI2Device`] answers pointer queries for one master device: where the pointer is, which
//! window it is over, and which modifiers and buttons are held. The protocol work goes through
//! a [`DeviceConnection`], implemented by [`XConnection`].
//!
//! Clients connected through an untrusted SECURITY context cannot query windows owned by other
//! clients. For them the queries are answered through throwaway input-only probe windows and by
//! scanning the client's own toplevels.

use dpi::{PhysicalPosition, PhysicalSize};
use toplevel_core::backend::{NativeWindow, PointerState};
use toplevel_core::error::Remote;
use toplevel_core::state::{EventMask, ModifierType};
use tracing::debug;
use x11rb::connection::Connection as _;
use x11rb::protocol::xinput::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _};

use crate::error::X11Error;
use crate::trap::trap;
use crate::xdisplay::XConnection;

/// The virtual core pointer every server has.
pub const VIRTUAL_CORE_POINTER: u16 = 2;

/// The `None` window.
const NONE: xproto::Window = 0;

// XInput 2.2 event types.
const XI_KEY_PRESS: u32 = 2;
const XI_KEY_RELEASE: u32 = 3;
const XI_BUTTON_PRESS: u32 = 4;
const XI_BUTTON_RELEASE: u32 = 5;
const XI_MOTION: u32 = 6;
const XI_ENTER: u32 = 7;
const XI_LEAVE: u32 = 8;
const XI_FOCUS_IN: u32 = 9;
const XI_FOCUS_OUT: u32 = 10;
const XI_LAST_EVENT: u32 = 26;

/// Words in an event mask covering every XInput 2.2 event.
const MASK_WORDS: usize = (XI_LAST_EVENT as usize / 8 + 1).div_ceil(4);

/// Buttons reported in a [`ModifierType`].
const MASK_BUTTONS: u32 = 5;

/// A pointer query answer in protocol terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPointer {
    pub root: xproto::Window,
    pub child: xproto::Window,
    pub root_x: f64,
    pub root_y: f64,
    pub win_x: f64,
    pub win_y: f64,
    pub same_screen: bool,
    /// Effective modifiers.
    pub mods: u32,
    /// Button mask words, bit `n` for button `n`.
    pub buttons: Vec<u32>,
    /// Effective keyboard group.
    pub group: u32,
}

/// Outcome of a device grab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabStatus {
    Success,
    AlreadyGrabbed,
    InvalidTime,
    NotViewable,
    Frozen,
    /// The server answered with a status this crate does not know.
    Failed,
}

impl From<xproto::GrabStatus> for GrabStatus {
    fn from(status: xproto::GrabStatus) -> Self {
        match status {
            xproto::GrabStatus::SUCCESS => GrabStatus::Success,
            xproto::GrabStatus::ALREADY_GRABBED => GrabStatus::AlreadyGrabbed,
            xproto::GrabStatus::INVALID_TIME => GrabStatus::InvalidTime,
            xproto::GrabStatus::NOT_VIEWABLE => GrabStatus::NotViewable,
            xproto::GrabStatus::FROZEN => GrabStatus::Frozen,
            _ => GrabStatus::Failed,
        }
    }
}

/// The window under the pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowAtPosition {
    /// The deepest known window containing the pointer.
    pub window: Option<NativeWindow>,
    /// Pointer position relative to `window`, `(-1, -1)` without one.
    pub position: PhysicalPosition<i32>,
    pub mask: ModifierType,
}

/// The requests an [`XI2Device`] makes.
///
/// Queries fail with [`X11Error::X11`] when the server rejects them.
pub trait DeviceConnection {
    fn root(&self) -> xproto::Window;

    fn is_trusted(&self) -> bool;

    fn xi_query_pointer(&self, device: u16, window: xproto::Window)
        -> Result<RawPointer, X11Error>;

    /// Create an unmapped 1×1 input-only child of `parent`.
    fn create_probe(&self, parent: xproto::Window, x: i16, y: i16)
        -> Result<xproto::Window, X11Error>;

    fn map_window(&self, window: xproto::Window) -> Result<(), X11Error>;

    fn destroy_window(&self, window: xproto::Window) -> Result<(), X11Error>;

    fn window_size(&self, window: xproto::Window) -> Result<PhysicalSize<i32>, X11Error>;

    fn grab_server(&self) -> Result<(), X11Error>;

    fn ungrab_server(&self) -> Result<(), X11Error>;

    fn xi_select_events(
        &self,
        device: u16,
        window: xproto::Window,
        mask: &[u32],
    ) -> Result<(), X11Error>;

    fn xi_grab_device(
        &self,
        device: u16,
        window: xproto::Window,
        time: u32,
        owner_events: bool,
        mask: &[u32],
    ) -> Result<GrabStatus, X11Error>;

    fn xi_ungrab_device(&self, device: u16, time: u32) -> Result<(), X11Error>;

    fn xi_warp_pointer(&self, device: u16, x: f64, y: f64) -> Result<(), X11Error>;
}

/// Combine XInput2 modifier, button and group state into a [`ModifierType`].
///
/// Only buttons 1 to 5 have a mask bit. The group lands in bits 13 and 14.
pub fn translate_state(mods: u32, buttons: &[u32], group: u32) -> ModifierType {
    let mut state = ModifierType::from_bits_retain(mods);

    for button in 1..=MASK_BUTTONS {
        let word = buttons.get((button / 32) as usize).copied().unwrap_or(0);
        if word & (1 << (button % 32)) != 0 {
            state |= ModifierType::button(button).unwrap_or(ModifierType::empty());
        }
    }

    state | ModifierType::from_bits_retain(group << ModifierType::GROUP_SHIFT)
}

/// Translate an [`EventMask`] into XInput2 event mask words.
pub fn translate_event_mask(event_mask: EventMask) -> Vec<u32> {
    let mut mask = vec![0u32; MASK_WORDS];
    let mut set = |event: u32| mask[(event / 32) as usize] |= 1 << (event % 32);

    if event_mask.intersects(EventMask::POINTER_MOTION | EventMask::POINTER_MOTION_HINT) {
        set(XI_MOTION);
    }

    if event_mask.intersects(
        EventMask::BUTTON_MOTION
            | EventMask::BUTTON1_MOTION
            | EventMask::BUTTON2_MOTION
            | EventMask::BUTTON3_MOTION,
    ) {
        set(XI_BUTTON_PRESS);
        set(XI_BUTTON_RELEASE);
        set(XI_MOTION);
    }

    if event_mask.contains(EventMask::SCROLL) {
        set(XI_BUTTON_PRESS);
        set(XI_BUTTON_RELEASE);
    }

    if event_mask.contains(EventMask::BUTTON_PRESS) {
        set(XI_BUTTON_PRESS);
    }

    if event_mask.contains(EventMask::BUTTON_RELEASE) {
        set(XI_BUTTON_RELEASE);
    }

    if event_mask.contains(EventMask::KEY_PRESS) {
        set(XI_KEY_PRESS);
    }

    if event_mask.contains(EventMask::KEY_RELEASE) {
        set(XI_KEY_RELEASE);
    }

    if event_mask.contains(EventMask::ENTER_NOTIFY) {
        set(XI_ENTER);
    }

    if event_mask.contains(EventMask::LEAVE_NOTIFY) {
        set(XI_LEAVE);
    }

    if event_mask.contains(EventMask::FOCUS_CHANGE) {
        set(XI_FOCUS_IN);
        set(XI_FOCUS_OUT);
    }

    mask
}

impl RawPointer {
    fn to_pointer_state(&self) -> PointerState {
        PointerState {
            root: PhysicalPosition::new(self.root_x, self.root_y),
            window: PhysicalPosition::new(self.win_x, self.win_y),
            mask: translate_state(self.mods, &self.buttons, self.group),
            child: (self.child != NONE).then_some(NativeWindow(self.child)),
            same_screen: self.same_screen,
        }
    }
}

/// An XInput2 master pointer.
#[derive(Debug)]
pub struct XI2Device<'a, C: DeviceConnection + ?Sized> {
    conn: &'a C,
    device_id: u16,
    nograbs: bool,
}

impl<'a, C: DeviceConnection + ?Sized> XI2Device<'a, C> {
    pub fn new(conn: &'a C, device_id: u16) -> Self {
        XI2Device { conn, device_id, nograbs: false }
    }

    /// Make [`XI2Device::grab`] report success without grabbing.
    pub fn with_nograbs(mut self, nograbs: bool) -> Self {
        self.nograbs = nograbs;
        self
    }

    #[inline]
    pub fn device_id(&self) -> u16 {
        self.device_id
    }

    fn query(&self, window: xproto::Window) -> Result<Remote<RawPointer>, X11Error> {
        trap(|| self.conn.xi_query_pointer(self.device_id, window))
    }

    /// The pointer relative to `window`.
    pub fn query_state(&self, window: NativeWindow) -> Result<Remote<PointerState>, X11Error> {
        if self.conn.is_trusted() {
            return Ok(self.query(window.raw())?.map(|reply| reply.to_pointer_state()));
        }

        let probe = self.conn.create_probe(self.conn.root(), 0, 0)?;
        let reply = self.query(probe);
        self.conn.destroy_window(probe)?;
        Ok(reply?.map(|reply| reply.to_pointer_state()))
    }

    /// Find the window under the pointer.
    ///
    /// `toplevels` are this client's toplevel windows and `is_known` tells whether a window
    /// belongs to this client. With `get_toplevel` the walk stops at the first known window below
    /// the root instead of descending to the deepest one.
    ///
    /// The server is grabbed for the duration of the walk.
    pub fn window_at_position(
        &self,
        toplevels: &[NativeWindow],
        is_known: impl Fn(NativeWindow) -> bool,
        get_toplevel: bool,
    ) -> Result<WindowAtPosition, X11Error> {
        self.conn.grab_server()?;
        let found = self.locate(toplevels, &is_known, get_toplevel);
        let ungrabbed = self.conn.ungrab_server();
        let found = found?;
        ungrabbed?;
        Ok(found)
    }

    fn locate(
        &self,
        toplevels: &[NativeWindow],
        is_known: &dyn Fn(NativeWindow) -> bool,
        get_toplevel: bool,
    ) -> Result<WindowAtPosition, X11Error> {
        let root = self.conn.root();
        let mut last_reply = None;

        let mut window = if self.conn.is_trusted() {
            match self.query(root)? {
                Ok(reply) => {
                    let start = if reply.root == root { reply.child } else { reply.root };
                    last_reply = Some(reply);
                    start
                },
                Err(_) => NONE,
            }
        } else {
            self.scan_toplevels(toplevels, &mut last_reply)?
        };

        let mut last = NONE;
        while window != NONE {
            last = window;
            let reply = match self.query(window)? {
                Ok(reply) => reply,
                Err(_) => break,
            };

            window = reply.child;
            let reply_root = reply.root;
            last_reply = Some(reply);

            if get_toplevel && last != reply_root && is_known(NativeWindow(last)) {
                break;
            }
        }

        let window = (last != NONE && is_known(NativeWindow(last))).then_some(NativeWindow(last));
        let (position, mask) = match last_reply {
            Some(reply) => (
                PhysicalPosition::new(reply.win_x as i32, reply.win_y as i32),
                translate_state(reply.mods, &reply.buttons, reply.group),
            ),
            None => (PhysicalPosition::new(-1, -1), ModifierType::empty()),
        };
        let position = if window.is_some() { position } else { PhysicalPosition::new(-1, -1) };

        Ok(WindowAtPosition { window, position, mask })
    }

    /// Find the toplevel, or child of one, containing the pointer without looking at windows
    /// of other clients.
    fn scan_toplevels(
        &self,
        toplevels: &[NativeWindow],
        last_reply: &mut Option<RawPointer>,
    ) -> Result<xproto::Window, X11Error> {
        for toplevel in toplevels.iter().map(|toplevel| toplevel.raw()) {
            let reply = match self.query(toplevel)? {
                Ok(reply) => reply,
                Err(_) => continue,
            };

            if reply.child != NONE {
                let child = reply.child;
                *last_reply = Some(reply);
                return Ok(child);
            }

            let size = match trap(|| self.conn.window_size(toplevel))? {
                Ok(size) => size,
                Err(_) => continue,
            };
            let (x, y) = (reply.win_x, reply.win_y);
            if x < 0.0 || y < 0.0 || x >= f64::from(size.width) || y >= f64::from(size.height) {
                continue;
            }

            // A childless toplevel, or one below another window?
            let probe = self.conn.create_probe(toplevel, x as i16, y as i16)?;
            let verified = self.conn.map_window(probe).and_then(|()| self.query(toplevel));
            self.conn.destroy_window(probe)?;

            if let Ok(reply) = verified? {
                if reply.child == probe {
                    *last_reply = Some(reply);
                    return Ok(toplevel);
                }
            }
        }

        Ok(NONE)
    }

    /// Select the XInput2 events matching `event_mask` on `window`.
    pub fn select_window_events(
        &self,
        window: NativeWindow,
        event_mask: EventMask,
    ) -> Result<(), X11Error> {
        let mask = translate_event_mask(event_mask);
        self.conn.xi_select_events(self.device_id, window.raw(), &mask)
    }

    /// Actively grab the device for `window`. `time` 0 means the current server time.
    pub fn grab(
        &self,
        window: NativeWindow,
        owner_events: bool,
        event_mask: EventMask,
        time: u32,
    ) -> Result<GrabStatus, X11Error> {
        if self.nograbs {
            debug!(device = self.device_id, window = window.raw(), "grab skipped");
            return Ok(GrabStatus::Success);
        }

        let mask = translate_event_mask(event_mask);
        self.conn.xi_grab_device(self.device_id, window.raw(), time, owner_events, &mask)
    }

    pub fn ungrab(&self, time: u32) -> Result<(), X11Error> {
        self.conn.xi_ungrab_device(self.device_id, time)
    }

    /// Move the pointer to `(x, y)` in root coordinates.
    pub fn warp(&self, x: f64, y: f64) -> Result<(), X11Error> {
        self.conn.xi_warp_pointer(self.device_id, x, y)
    }
}

#[inline]
fn fp1616_to_f64(value: xinput::Fp1616) -> f64 {
    f64::from(value) / 65536.0
}

#[inline]
fn f64_to_fp1616(value: f64) -> xinput::Fp1616 {
    (value * 65536.0) as xinput::Fp1616
}

impl DeviceConnection for XConnection {
    fn root(&self) -> xproto::Window {
        XConnection::root(self)
    }

    fn is_trusted(&self) -> bool {
        XConnection::is_trusted(self)
    }

    fn xi_query_pointer(
        &self,
        device: u16,
        window: xproto::Window,
    ) -> Result<RawPointer, X11Error> {
        let reply = self.xcb_connection().xinput_xi_query_pointer(window, device)?.reply()?;
        Ok(RawPointer {
            root: reply.root,
            child: reply.child,
            root_x: fp1616_to_f64(reply.root_x),
            root_y: fp1616_to_f64(reply.root_y),
            win_x: fp1616_to_f64(reply.win_x),
            win_y: fp1616_to_f64(reply.win_y),
            same_screen: reply.same_screen,
            mods: reply.mods.effective,
            buttons: reply.buttons,
            group: u32::from(reply.group.effective),
        })
    }

    fn create_probe(
        &self,
        parent: xproto::Window,
        x: i16,
        y: i16,
    ) -> Result<xproto::Window, X11Error> {
        self.create_input_only(parent, x, y, false)
    }

    fn map_window(&self, window: xproto::Window) -> Result<(), X11Error> {
        self.xcb_connection().map_window(window)?;
        Ok(())
    }

    fn destroy_window(&self, window: xproto::Window) -> Result<(), X11Error> {
        self.xcb_connection().destroy_window(window)?;
        Ok(())
    }

    fn window_size(&self, window: xproto::Window) -> Result<PhysicalSize<i32>, X11Error> {
        let geometry = self.xcb_connection().get_geometry(window)?.reply()?;
        Ok(PhysicalSize::new(geometry.width.into(), geometry.height.into()))
    }

    fn grab_server(&self) -> Result<(), X11Error> {
        self.xcb_connection().grab_server()?;
        Ok(())
    }

    fn ungrab_server(&self) -> Result<(), X11Error> {
        self.xcb_connection().ungrab_server()?;
        self.xcb_connection().flush()?;
        Ok(())
    }

    fn xi_select_events(
        &self,
        device: u16,
        window: xproto::Window,
        mask: &[u32],
    ) -> Result<(), X11Error> {
        let mask = xinput::EventMask {
            deviceid: device,
            mask: mask.iter().map(|&word| word.into()).collect(),
        };
        self.xcb_connection().xinput_xi_select_events(window, &[mask])?;
        Ok(())
    }

    fn xi_grab_device(
        &self,
        device: u16,
        window: xproto::Window,
        time: u32,
        owner_events: bool,
        mask: &[u32],
    ) -> Result<GrabStatus, X11Error> {
        let owner =
            if owner_events { xinput::GrabOwner::OWNER } else { xinput::GrabOwner::NO_OWNER };
        let reply = self
            .xcb_connection()
            .xinput_xi_grab_device(
                window,
                time,
                x11rb::NONE,
                device,
                xproto::GrabMode::ASYNC,
                xproto::GrabMode::ASYNC,
                owner,
                mask,
            )?
            .reply()?;
        Ok(reply.status.into())
    }

    fn xi_ungrab_device(&self, device: u16, time: u32) -> Result<(), X11Error> {
        self.xcb_connection().xinput_xi_ungrab_device(time, device)?;
        Ok(())
    }

    fn xi_warp_pointer(&self, device: u16, x: f64, y: f64) -> Result<(), X11Error> {
        self.xcb_connection().xinput_xi_warp_pointer(
            x11rb::NONE,
            self.root(),
            0,
            0,
            0,
            0,
            f64_to_fp1616(x),
            f64_to_fp1616(y),
            device,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_one_to_five_are_reported() {
        // Bit 0 is unused, bit 6 is button 6.
        let buttons = [0b100_1011];
        let state = translate_state(ModifierType::SHIFT.bits(), &buttons, 0);
        assert_eq!(
            state,
            ModifierType::SHIFT | ModifierType::BUTTON1 | ModifierType::BUTTON3
        );

        let state = translate_state(0, &[1 << 5], 0);
        assert_eq!(state, ModifierType::BUTTON5);
        assert_eq!(translate_state(0, &[], 0), ModifierType::empty());
    }

    #[test]
    fn group_is_shifted_into_place() {
        let state = translate_state(ModifierType::CONTROL.bits(), &[], 2);
        assert_eq!(state.group(), 2);
        assert!(state.contains(ModifierType::CONTROL | ModifierType::GROUP_HIGH));
    }

    #[test]
    fn motion_masks_select_buttons_too() {
        let mask = translate_event_mask(EventMask::BUTTON1_MOTION);
        let buttons = (1 << XI_BUTTON_PRESS) | (1 << XI_BUTTON_RELEASE);
        assert_eq!(mask, vec![(1 << XI_MOTION) | buttons]);

        let mask = translate_event_mask(EventMask::POINTER_MOTION_HINT);
        assert_eq!(mask, vec![1 << XI_MOTION]);
    }

    #[test]
    fn focus_and_crossing_masks() {
        let mask = translate_event_mask(
            EventMask::FOCUS_CHANGE | EventMask::ENTER_NOTIFY | EventMask::KEY_RELEASE,
        );
        assert_eq!(
            mask,
            vec![(1 << XI_FOCUS_IN) | (1 << XI_FOCUS_OUT) | (1 << XI_ENTER) | (1 << XI_KEY_RELEASE)]
        );
        assert_eq!(translate_event_mask(EventMask::empty()), vec![0]);
    }

    #[test]
    fn scroll_selects_button_events() {
        let mask = translate_event_mask(EventMask::SCROLL);
        assert_eq!(mask, vec![(1 << XI_BUTTON_PRESS) | (1 << XI_BUTTON_RELEASE)]);
    }

    #[test]
    fn fixed_point_conversion() {
        assert_eq!(fp1616_to_f64(0x0001_8000), 1.5);
        assert_eq!(f64_to_fp1616(-2.0), -0x0002_0000);
        assert_eq!(GrabStatus::from(xproto::GrabStatus::FROZEN), GrabStatus::Frozen);
    }
}
