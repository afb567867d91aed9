//! Translation of X events into [`BackendEvent`]s.

use toplevel_core::backend::NativeWindow;
use toplevel_core::event::BackendEvent;
use toplevel_core::geometry::Rect;
use toplevel_core::state::WindowState;
use tracing::{debug, trace};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::Event;

use crate::backend::Shared;
use crate::error::X11Error;
use crate::trap::trap;

impl Shared {
    /// Translate one X event, queueing the resulting backend events.
    pub(crate) fn process_event(&self, event: Event) -> Result<(), X11Error> {
        let sent = event.sent_event();
        match event {
            Event::ConfigureNotify(event) => self.configure_notify(event, sent)?,
            Event::MapNotify(event) => self.map_notify(event.window),
            Event::UnmapNotify(event) => self.unmap_notify(event.window),
            Event::PropertyNotify(event) => self.property_notify(event)?,
            Event::ClientMessage(event) => self.client_message(event),
            Event::DestroyNotify(event) => self.destroy_notify(event.window),
            Event::RandrScreenChangeNotify(event) => {
                self.screen_resized(Rect::from_size(event.width.into(), event.height.into()))
            },
            Event::RandrNotify(_) => self.push_event(BackendEvent::MonitorsChanged),
            Event::Error(error) => {
                debug!(
                    request = error.request_name.unwrap_or("unknown"),
                    kind = ?error.error_kind,
                    bad_value = error.bad_value,
                    "asynchronous X11 error"
                );
            },
            event => trace!(?event, "ignored X event"),
        }

        Ok(())
    }

    fn configure_notify(
        &self,
        event: xproto::ConfigureNotifyEvent,
        sent: bool,
    ) -> Result<(), X11Error> {
        let root = self.xconn.root();
        if event.window == root {
            self.screen_resized(Rect::from_size(event.width.into(), event.height.into()));
            return Ok(());
        }

        if event.event != event.window || !self.is_known(event.window) {
            return Ok(());
        }

        // Real notifies are relative to the frame, synthetic ones come from the window manager
        // in root coordinates.
        let origin = if sent {
            (i32::from(event.x), i32::from(event.y))
        } else {
            let conn = self.xconn.xcb_connection();
            let translated = trap(|| {
                let reply = conn.translate_coordinates(event.window, root, 0, 0)?.reply()?;
                Ok((i32::from(reply.dst_x), i32::from(reply.dst_y)))
            })?;
            match translated {
                Ok(origin) => origin,
                Err(_) => return Ok(()),
            }
        };

        let rect = Rect::new(origin.0, origin.1, event.width.into(), event.height.into());
        self.push_event(BackendEvent::Configure { window: NativeWindow(event.window), rect });
        Ok(())
    }

    fn map_notify(&self, window: xproto::Window) {
        let Some(old) = self.window_state(window) else {
            return;
        };

        self.push_event(BackendEvent::Map { window: NativeWindow(window) });
        self.update_state(window, old - (WindowState::WITHDRAWN | WindowState::ICONIFIED));
    }

    fn unmap_notify(&self, window: xproto::Window) {
        let Some(old) = self.window_state(window) else {
            return;
        };

        self.push_event(BackendEvent::Unmap { window: NativeWindow(window) });
        if !old.contains(WindowState::ICONIFIED) {
            self.update_state(window, old | WindowState::WITHDRAWN);
        }
    }

    fn property_notify(&self, event: xproto::PropertyNotifyEvent) -> Result<(), X11Error> {
        let atoms = self.xconn.atoms();

        if event.window == self.xconn.root() {
            if event.atom == atoms._NET_WORKAREA {
                self.push_event(BackendEvent::MonitorsChanged);
            }
            return Ok(());
        }

        if event.atom != atoms._NET_WM_STATE {
            return Ok(());
        }

        let Some(old) = self.window_state(event.window) else {
            return Ok(());
        };

        let property = trap(|| {
            self.xconn.get_property32(event.window, atoms._NET_WM_STATE, xproto::AtomEnum::ATOM)
        })?;
        if let Ok(property) = property {
            let new = (old & WindowState::WITHDRAWN) | self.state_atoms.decode(&property);
            self.update_state(event.window, new);
        }

        Ok(())
    }

    fn client_message(&self, event: xproto::ClientMessageEvent) {
        let atoms = self.xconn.atoms();
        if event.format != 32 || event.type_ != atoms.WM_PROTOCOLS {
            return;
        }

        let data = event.data.as_data32();
        let window = event.window;
        if data[0] == atoms.WM_DELETE_WINDOW {
            if self.is_known(window) {
                self.push_event(BackendEvent::DeleteRequest { window: NativeWindow(window) });
            }
        } else if data[0] == atoms._NET_WM_SYNC_REQUEST {
            let value = u64::from(data[2]) | (u64::from(data[3]) << 32);
            if let Some(record) = self.windows.borrow_mut().get_mut(&window) {
                trace!(window, value, "sync request");
                record.sync_value = Some(value);
            }
        }
    }

    fn destroy_notify(&self, window: xproto::Window) {
        if self.windows.borrow_mut().remove(&window).is_some() {
            self.push_event(BackendEvent::Destroyed { window: NativeWindow(window) });
        }
    }

    fn screen_resized(&self, rect: Rect) {
        if self.xconn.set_screen_rect(rect) {
            self.push_event(BackendEvent::ScreenSizeChanged { rect });
        }
    }

    fn window_state(&self, window: xproto::Window) -> Option<WindowState> {
        self.windows.borrow().get(&window).map(|record| record.state)
    }

    /// Store the new state and report the difference.
    fn update_state(&self, window: xproto::Window, new: WindowState) {
        let old = match self.windows.borrow_mut().get_mut(&window) {
            Some(record) => std::mem::replace(&mut record.state, new),
            None => return,
        };

        if old != new {
            let window = NativeWindow(window);
            self.push_event(BackendEvent::StateChanged { window, changed: old ^ new, new });
        }
    }
}
