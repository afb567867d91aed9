//! Toplevel window geometry management.
//!
//! `toplevel` keeps a toplevel window's size and position in agreement with a window manager
//! that answers requests asynchronously. A [`Window`] computes what it wants from its
//! [`Content`], its default size, its [`GeometryHints`] and a [`PositionPolicy`], sends the
//! difference to the [`WindowSystem`], and waits for the configure notify before laying out
//! again. The [`Screen`] tracks the monitors the window is placed on.
//!
//! ```
//! use toplevel::headless::HeadlessBackend;
//! use toplevel::{Context, ContextAttributes, FixedContent, PositionPolicy, WindowAttributes};
//!
//! let backend = HeadlessBackend::new(1920, 1080);
//! let context = Context::new(backend.boxed(), ContextAttributes::default()).unwrap();
//!
//! let window = context.create_window(
//!     WindowAttributes::default()
//!         .with_title("Hello")
//!         .with_position(PositionPolicy::Center)
//!         .with_content(FixedContent::new(300, 200)),
//! );
//! window.show();
//! backend.settle(&context).unwrap();
//!
//! assert_eq!(window.size().width, 300);
//! assert_eq!(window.position().x, 810);
//! ```
//!
//! # Window systems
//!
//! Anything implementing [`WindowSystem`] can host windows. Two implementations ship with this
//! crate:
//!
//! - [`headless::HeadlessBackend`], an in-memory window system that records requests.
//! - [`platform::x11::X11Backend`], talking to an X server through `x11rb`.
//!
//! # Debugging
//!
//! The `TOPLEVEL_DEBUG` environment variable takes a comma separated list of [`DebugFlags`]:
//! `multihead` splits the screen into four fake monitors, `geometry` logs every reconciliation
//! pass at debug level and `nograbs` turns device grabs into no-ops. Logging goes through
//! [`tracing`].
//!
//! # Cargo Features
//!
//! This crate provides the following features:
//!
//! - `x11` (enabled by default): the X11 backend, on free unix platforms.
//! - `serde`: serialization of the geometry, hint, state and monitor types with [`serde`].
//!
//! [`tracing`]: https://docs.rs/tracing
//! [`serde`]: https://docs.rs/serde
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use dpi;
pub use toplevel_core::backend::{
    NativeWindow, NativeWindowAttributes, PointerState, WindowKind, WindowSystem,
};
pub use toplevel_core::error::{NotSupportedError, OsError, Remote, RequestError, ServerError};
pub use toplevel_core::event::BackendEvent;
pub use toplevel_core::geometry::{Gravity, Rect};
pub use toplevel_core::hints::{GeometryHints, HintFlags};
pub use toplevel_core::monitor::{Monitor, MonitorSet, TopologyProbe};
pub use toplevel_core::state::{EventMask, ModifierType, WindowState};

pub use crate::configure::{LastRequest, PositionPolicy};
pub use crate::content::{Content, FixedContent};
pub use crate::context::{Context, ContextAttributes, DebugFlags, DEBUG_ENV};
pub use crate::group::{Device, GrabTarget, WindowGroup};
pub use crate::icon::{BadIcon, Icon};
pub use crate::keys::WidgetId;
pub use crate::parse::ParsedGeometry;
pub use crate::reconcile::ReconcileState;
pub use crate::topology::Screen;
pub use crate::window::{
    Positionable, Realizable, Resizable, StateChange, Window, WindowAttributes, WindowId,
};

pub mod configure;
pub mod content;
mod context;
mod deferred;
pub mod group;
pub mod headless;
pub mod hints;
pub mod icon;
pub mod keys;
mod observer;
pub mod parse;
pub mod reconcile;
pub mod startup;
pub mod topology;
mod window;

/// Window system backends for specific platforms.
pub mod platform {
    /// The X11 backend.
    #[cfg(x11_platform)]
    pub mod x11 {
        pub use toplevel_x11::*;
    }
}
