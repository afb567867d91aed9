use std::cell::Cell;
use std::fmt;

use toplevel_core::geometry::Rect;
use tracing::{debug, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::cookie::VoidCookie;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::sync::ConnectionExt as _;
use x11rb::protocol::xinput::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::{sync, xinerama};
use x11rb::rust_connection::RustConnection;
use x11rb::x11_utils::Serialize;

use crate::atoms::Atoms;
use crate::error::X11Error;
use crate::trap::trap;

/// Versions of the extensions the backend uses, `None` when missing.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Extensions {
    pub randr: Option<(u32, u32)>,
    pub randr_first_event: Option<u8>,
    pub xinerama: bool,
    pub xinput: Option<(u16, u16)>,
    pub sync: bool,
}

/// A connection to an X server and the facts learned while opening it.
pub struct XConnection {
    xcb: RustConnection,
    screen_num: usize,
    root: xproto::Window,
    atoms: Atoms,
    extensions: Extensions,
    trusted: bool,
    screen: Cell<Rect>,
}

impl fmt::Debug for XConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XConnection")
            .field("screen_num", &self.screen_num)
            .field("root", &self.root)
            .field("extensions", &self.extensions)
            .field("trusted", &self.trusted)
            .finish_non_exhaustive()
    }
}

impl XConnection {
    /// Connect to `display_name`, or to `$DISPLAY` when `None`.
    pub fn new(display_name: Option<&str>) -> Result<XConnection, X11Error> {
        let (xcb, screen_num) = x11rb::connect(display_name)?;
        let screen =
            xcb.setup().roots.get(screen_num).ok_or(X11Error::InvalidScreen(screen_num))?;
        let root = screen.root;
        let rect = Rect::from_size(screen.width_in_pixels.into(), screen.height_in_pixels.into());

        let atoms = Atoms::new(&xcb)?.reply()?;
        let extensions = query_extensions(&xcb)?;

        // Root resizes, `_NET_WORKAREA` updates and output changes.
        let root_mask = xproto::EventMask::STRUCTURE_NOTIFY | xproto::EventMask::PROPERTY_CHANGE;
        xcb.change_window_attributes(
            root,
            &xproto::ChangeWindowAttributesAux::new().event_mask(root_mask),
        )?;
        if extensions.randr_first_event.is_some() {
            xcb.randr_select_input(
                root,
                randr::NotifyMask::SCREEN_CHANGE
                    | randr::NotifyMask::CRTC_CHANGE
                    | randr::NotifyMask::OUTPUT_CHANGE,
            )?;
        }

        // Clients connected through an untrusted SECURITY context may not look at the root.
        let trusted = match trap(|| Ok(xcb.query_pointer(root)?.reply()?))? {
            Err(err) if err.is_protocol() => {
                warn!(
                    "Connection to display {} appears to be untrusted. Pointer and keyboard \
                     grabs may not work as expected.",
                    display_name.unwrap_or("$DISPLAY")
                );
                false
            },
            _ => true,
        };

        debug!(?extensions, trusted, "connected to the X server");

        Ok(XConnection {
            xcb,
            screen_num,
            root,
            atoms,
            extensions,
            trusted,
            screen: Cell::new(rect),
        })
    }

    #[inline]
    pub fn xcb_connection(&self) -> &RustConnection {
        &self.xcb
    }

    #[inline]
    pub fn screen_num(&self) -> usize {
        self.screen_num
    }

    #[inline]
    pub fn root(&self) -> xproto::Window {
        self.root
    }

    #[inline]
    pub(crate) fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    #[inline]
    pub(crate) fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Whether the server lets this client query windows it does not own.
    #[inline]
    pub fn is_trusted(&self) -> bool {
        self.trusted
    }

    pub fn has_randr13(&self) -> bool {
        matches!(self.extensions.randr, Some((major, minor)) if (major, minor) >= (1, 3))
    }

    pub fn has_xinerama(&self) -> bool {
        self.extensions.xinerama
    }

    pub fn has_xinput2(&self) -> bool {
        self.extensions.xinput.is_some()
    }

    /// The root window geometry as of the last root configure.
    pub fn screen_rect(&self) -> Rect {
        self.screen.get()
    }

    pub(crate) fn set_screen_rect(&self, rect: Rect) -> bool {
        self.screen.replace(rect) != rect
    }

    /// Read a format 32 property, returning an empty list when it is unset.
    pub(crate) fn get_property32(
        &self,
        window: xproto::Window,
        property: xproto::Atom,
        type_: impl Into<xproto::Atom>,
    ) -> Result<Vec<u32>, X11Error> {
        let type_: xproto::Atom = type_.into();
        let reply =
            self.xcb.get_property(false, window, property, type_, 0, u32::MAX / 4)?.reply()?;
        Ok(reply.value32().map(Iterator::collect).unwrap_or_default())
    }

    pub(crate) fn send_client_msg(
        &self,
        window: xproto::Window, // The window this is "about"; not necessarily this window
        target_window: xproto::Window, // The window we're sending to
        message_type: xproto::Atom,
        event_mask: Option<xproto::EventMask>,
        data: impl Into<xproto::ClientMessageData>,
    ) -> Result<VoidCookie<'_, RustConnection>, X11Error> {
        let event = xproto::ClientMessageEvent {
            response_type: xproto::CLIENT_MESSAGE_EVENT,
            window,
            format: 32,
            data: data.into(),
            sequence: 0,
            type_: message_type,
        };

        self.xcb
            .send_event(
                false,
                target_window,
                event_mask.unwrap_or(xproto::EventMask::NO_EVENT),
                event.serialize(),
            )
            .map_err(Into::into)
    }

    /// Send a message to the window manager through the root window.
    pub(crate) fn send_wm_msg(
        &self,
        window: xproto::Window,
        message_type: xproto::Atom,
        data: [u32; 5],
    ) -> Result<(), X11Error> {
        self.send_client_msg(
            window,
            self.root,
            message_type,
            Some(xproto::EventMask::SUBSTRUCTURE_REDIRECT | xproto::EventMask::SUBSTRUCTURE_NOTIFY),
            data,
        )?;
        Ok(())
    }

    /// Create a 1×1 input-only window.
    pub(crate) fn create_input_only(
        &self,
        parent: xproto::Window,
        x: i16,
        y: i16,
        override_redirect: bool,
    ) -> Result<xproto::Window, X11Error> {
        let window = self.xcb.generate_id()?;
        self.xcb.create_window(
            0,
            window,
            parent,
            x,
            y,
            1,
            1,
            0,
            xproto::WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &xproto::CreateWindowAux::new().override_redirect(u32::from(override_redirect)),
        )?;
        Ok(window)
    }
}

fn query_extensions(xcb: &RustConnection) -> Result<Extensions, X11Error> {
    let mut extensions = Extensions::default();

    if let Some(info) = xcb.extension_information(randr::X11_EXTENSION_NAME)? {
        let version = xcb.randr_query_version(1, 3)?.reply()?;
        extensions.randr = Some((version.major_version, version.minor_version));
        extensions.randr_first_event = Some(info.first_event);
    }

    if xcb.extension_information(xinerama::X11_EXTENSION_NAME)?.is_some() {
        extensions.xinerama = true;
    }

    if xcb.extension_information(xinput::X11_EXTENSION_NAME)?.is_some() {
        let version = xcb.xinput_xi_query_version(2, 2)?.reply()?;
        if version.major_version >= 2 {
            extensions.xinput = Some((version.major_version, version.minor_version));
        }
    }

    if xcb.extension_information(sync::X11_EXTENSION_NAME)?.is_some() {
        xcb.sync_initialize(3, 1)?.reply()?;
        extensions.sync = true;
    }

    Ok(extensions)
}
