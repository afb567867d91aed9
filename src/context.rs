//! The process-wide registry: backend, screen, toplevel list and deferred work.

use std::cell::{Cell, RefCell};
use std::env;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use bitflags::bitflags;
use calloop::{EventLoop, LoopHandle};
use toplevel_core::backend::{NativeWindow, WindowSystem};
use toplevel_core::error::OsError;
use toplevel_core::event::BackendEvent;
use toplevel_core::os_error;
use tracing::{debug, trace, warn};

use crate::group::WindowGroup;
use crate::icon::Icon;
use crate::topology::Screen;
use crate::window::{Window, WindowAttributes, WindowId, WindowShared};

/// Environment variable holding comma separated [`DebugFlags`] names.
pub const DEBUG_ENV: &str = "TOPLEVEL_DEBUG";

bitflags! {
    /// Debugging switches.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DebugFlags: u32 {
        /// Pretend the screen is made of four monitors.
        const MULTIHEAD = 1 << 0;
        /// Log every reconciliation pass at debug level.
        const GEOMETRY = 1 << 1;
        /// Report device grabs as successful without grabbing.
        const NOGRABS = 1 << 2;
    }
}

impl DebugFlags {
    /// Parse a comma separated, case insensitive list of flag names.
    ///
    /// Unknown names are ignored with a warning.
    pub fn parse(value: &str) -> Self {
        let mut flags = DebugFlags::empty();
        for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            match name.to_ascii_lowercase().as_str() {
                "multihead" => flags |= DebugFlags::MULTIHEAD,
                "geometry" => flags |= DebugFlags::GEOMETRY,
                "nograbs" => flags |= DebugFlags::NOGRABS,
                "all" => flags = DebugFlags::all(),
                _ => warn!("unknown debug flag {name:?} in {DEBUG_ENV}"),
            }
        }
        flags
    }

    /// The flags set in the environment.
    pub fn from_env() -> Self {
        env::var(DEBUG_ENV).map(|value| Self::parse(&value)).unwrap_or_default()
    }
}

/// Attributes used when creating a [`Context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAttributes {
    pub(crate) mnemonic_delay: Duration,
    pub(crate) startup_notification: bool,
    pub(crate) auto_mnemonics: bool,
    pub(crate) debug: DebugFlags,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        ContextAttributes {
            mnemonic_delay: Duration::from_millis(300),
            startup_notification: true,
            auto_mnemonics: true,
            debug: DebugFlags::from_env(),
        }
    }
}

impl ContextAttributes {
    /// How long a modifier must be held before mnemonics are shown.
    pub fn with_mnemonic_delay(mut self, delay: Duration) -> Self {
        self.mnemonic_delay = delay;
        self
    }

    /// Whether to tell the launcher when windows are mapped.
    pub fn with_startup_notification(mut self, enabled: bool) -> Self {
        self.startup_notification = enabled;
        self
    }

    /// Hide mnemonics when a window is mapped until a modifier is pressed.
    pub fn with_auto_mnemonics(mut self, enabled: bool) -> Self {
        self.auto_mnemonics = enabled;
        self
    }

    pub fn with_debug_flags(mut self, debug: DebugFlags) -> Self {
        self.debug = debug;
        self
    }

    pub fn debug_flags(&self) -> DebugFlags {
        self.debug
    }
}

pub(crate) struct ContextShared {
    pub(crate) backend: RefCell<Box<dyn WindowSystem>>,
    pub(crate) screen: Screen,
    pub(crate) attributes: ContextAttributes,
    pub(crate) handle: LoopHandle<'static, ()>,
    pub(crate) startup_sent: Cell<bool>,
    toplevels: RefCell<Vec<Weak<WindowShared>>>,
    default_icons: RefCell<Vec<Icon>>,
    pub(crate) default_group: WindowGroup,
    event_loop: RefCell<EventLoop<'static, ()>>,
    next_id: Cell<u64>,
    shut_down: Cell<bool>,
}

impl ContextShared {
    pub(crate) fn default_icons(&self) -> Vec<Icon> {
        self.default_icons.borrow().clone()
    }

    pub(crate) fn forget_toplevel(&self, id: WindowId) {
        self.toplevels
            .borrow_mut()
            .retain(|window| window.upgrade().is_some_and(|window| window.id != id));
    }
}

/// The toolkit's process-wide state.
///
/// Owns the window system backend, the screen, the list of toplevel windows and the event loop
/// running deferred work. Cheap to clone; clones refer to the same context.
#[derive(Clone)]
pub struct Context {
    pub(crate) shared: Rc<ContextShared>,
}

impl Context {
    /// Take over `backend` and discover the screen.
    pub fn new(
        backend: Box<dyn WindowSystem>,
        attributes: ContextAttributes,
    ) -> Result<Self, OsError> {
        let event_loop = EventLoop::try_new().map_err(|err| os_error!(err))?;
        let handle = event_loop.handle();

        let multihead = attributes.debug.contains(DebugFlags::MULTIHEAD);
        let screen = Screen::new(backend.as_ref(), multihead);
        debug!(rect = ?screen.rect(), n_monitors = screen.n_monitors(), "context created");

        Ok(Context {
            shared: Rc::new(ContextShared {
                backend: RefCell::new(backend),
                screen,
                attributes,
                handle,
                startup_sent: Cell::new(false),
                toplevels: RefCell::new(Vec::new()),
                default_icons: RefCell::new(Vec::new()),
                default_group: WindowGroup::new(),
                event_loop: RefCell::new(event_loop),
                next_id: Cell::new(1),
                shut_down: Cell::new(false),
            }),
        })
    }

    /// Create a toplevel window. The native window is only created when it is first shown.
    pub fn create_window(&self, attributes: WindowAttributes) -> Window {
        if self.shared.shut_down.get() {
            warn!("creating a window on a context that was shut down");
        }

        let id = WindowId(self.shared.next_id.get());
        self.shared.next_id.set(id.0 + 1);

        let window = Window::new(self.shared.clone(), id, attributes);
        self.shared.toplevels.borrow_mut().push(window.downgrade());
        window
    }

    /// The live toplevel windows, in creation order.
    pub fn list_toplevels(&self) -> Vec<Window> {
        let mut toplevels = self.shared.toplevels.borrow_mut();
        toplevels.retain(|window| window.strong_count() > 0);
        toplevels.iter().filter_map(Window::upgrade).collect()
    }

    pub fn screen(&self) -> &Screen {
        &self.shared.screen
    }

    pub fn attributes(&self) -> &ContextAttributes {
        &self.shared.attributes
    }

    /// The group of windows without an explicit group.
    pub fn default_group(&self) -> WindowGroup {
        self.shared.default_group.clone()
    }

    /// Icons used by windows without icons of their own.
    pub fn set_default_icons(&self, icons: Vec<Icon>) {
        *self.shared.default_icons.borrow_mut() = icons;
    }

    pub fn default_icons(&self) -> Vec<Icon> {
        self.shared.default_icons()
    }

    /// Run `f` with the backend. Must not be called from inside another backend call.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut dyn WindowSystem) -> R) -> R {
        f(self.shared.backend.borrow_mut().as_mut())
    }

    fn find_window(&self, native: NativeWindow) -> Option<Window> {
        self.list_toplevels().into_iter().find(|window| window.native_window() == Some(native))
    }

    /// Route an event from the window system to the window or screen it concerns.
    pub fn handle_event(&self, event: BackendEvent) {
        trace!(?event, "handling event");

        let Some(native) = event.window() else {
            self.handle_screen_event(event);
            return;
        };

        let Some(window) = self.find_window(native) else {
            trace!(?native, "event for an unknown window");
            return;
        };

        match event {
            BackendEvent::Configure { rect, .. } => window.handle_configure(rect),
            BackendEvent::Map { .. } => window.handle_map_event(),
            BackendEvent::Unmap { .. } => trace!(id = ?window.id(), "window unmapped"),
            BackendEvent::StateChanged { changed, new, .. } => {
                window.handle_state_changed(changed, new)
            },
            BackendEvent::DeleteRequest { .. } => window.handle_delete_request(),
            BackendEvent::Destroyed { .. } => window.handle_destroyed(),
            BackendEvent::MonitorsChanged | BackendEvent::ScreenSizeChanged { .. } => {},
        }
    }

    fn handle_screen_event(&self, event: BackendEvent) {
        let screen = &self.shared.screen;
        let resized = match event {
            BackendEvent::ScreenSizeChanged { rect } => screen.set_rect(rect),
            _ => false,
        };

        // Observers may call back into the backend, so it must not be borrowed while they run.
        let discovery = screen.discover(self.shared.backend.borrow().as_ref());
        screen.apply(discovery);

        if resized {
            screen.notify_size_changed();
        }
    }

    /// Run deferred work and queued reconciliation passes.
    ///
    /// Waits at most `timeout` for work to become ready, `None` waits indefinitely.
    pub fn dispatch(&self, timeout: Option<Duration>) -> Result<(), OsError> {
        let mut event_loop = self
            .shared
            .event_loop
            .try_borrow_mut()
            .map_err(|_| os_error!("dispatch is not reentrant"))?;
        event_loop.dispatch(timeout, &mut ()).map_err(|err| os_error!(err))?;
        drop(event_loop);

        self.shared.backend.borrow_mut().flush().map_err(|err| os_error!(err.to_string()))
    }

    /// Destroy every toplevel window and drop all observers and icons.
    pub fn shutdown(&self) {
        if self.shared.shut_down.replace(true) {
            return;
        }

        for window in self.list_toplevels() {
            window.destroy();
        }

        self.shared.toplevels.borrow_mut().clear();
        self.shared.default_icons.borrow_mut().clear();
        self.shared.screen.clear_observers();
        debug!("context shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.shut_down.get()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("screen", &self.shared.screen.rect())
            .field("toplevels", &self.shared.toplevels.borrow().len())
            .field("attributes", &self.shared.attributes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flags_are_case_insensitive() {
        assert_eq!(
            DebugFlags::parse("MultiHead, nograbs"),
            DebugFlags::MULTIHEAD | DebugFlags::NOGRABS
        );
        assert_eq!(DebugFlags::parse("bogus,geometry"), DebugFlags::GEOMETRY);
        assert_eq!(DebugFlags::parse(""), DebugFlags::empty());
        assert_eq!(DebugFlags::parse("all"), DebugFlags::all());
    }

    #[test]
    fn attribute_defaults() {
        let attributes = ContextAttributes::default().with_debug_flags(DebugFlags::empty());
        assert_eq!(attributes.mnemonic_delay, Duration::from_millis(300));
        assert!(attributes.startup_notification);
        assert!(attributes.auto_mnemonics);
    }
}
