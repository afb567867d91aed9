//! Building the configure request for a toplevel window.
//!
//! A configure request is the rectangle a window asks the window system for. Its size comes
//! from, in order of increasing priority: a guess based on the screen and the content (before
//! the window was first mapped) or the current allocation (afterwards), the application's
//! default size, and a pending one-shot resize. Its position is only computed while the window
//! is being placed, according to a [`PositionPolicy`].

use dpi::PhysicalPosition;
use toplevel_core::geometry::{Gravity, Rect};
use toplevel_core::hints::GeometryHints;
use tracing::trace;

use crate::content::Content;
use crate::hints::{compute_hints, guess_default_size, HintSettings};
use crate::topology::Screen;

/// Where a window is placed when it is shown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionPolicy {
    /// Leave placement to the window manager.
    #[default]
    None,
    /// Center on the monitor containing the pointer.
    Center,
    /// Like [`PositionPolicy::Center`], and keep the window centered when it is resized.
    CenterAlways,
    /// Center over the transient parent.
    CenterOnParent,
    /// Center under the pointer.
    Mouse,
}

/// A pending resize, consumed by the next reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeRequest {
    pub width: i32,
    pub height: i32,
    /// The size is in resize increments rather than pixels.
    pub in_increments: bool,
}

/// The most recently sent configure request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastRequest {
    /// Hints as computed, without [`HintFlags::POS`](toplevel_core::hints::HintFlags::POS).
    pub hints: GeometryHints,
    pub rect: Rect,
}

impl Default for LastRequest {
    fn default() -> Self {
        LastRequest { hints: GeometryHints::default(), rect: Rect::new(0, 0, -1, -1) }
    }
}

/// Per-window geometry settings, created by the first geometry operation on a window.
#[derive(Debug, Clone)]
pub struct GeometryInfo {
    /// Hints set by the application.
    pub hints: GeometryHints,
    /// The hints refer to a geometry widget inside the content.
    pub geometry_widget: bool,
    /// `-1` when unset.
    pub default_width: i32,
    /// `-1` when unset.
    pub default_height: i32,
    /// The default size is in resize increments rather than pixels.
    pub default_is_geometry: bool,
    pub resize: Option<SizeRequest>,
    /// Position requested before the window was placed, honoured once.
    pub initial_position: Option<PhysicalPosition<i32>>,
    /// A standing position constraint was switched on since the last pass.
    pub position_constraints_changed: bool,
    pub last: LastRequest,
}

impl Default for GeometryInfo {
    fn default() -> Self {
        GeometryInfo {
            hints: GeometryHints::default(),
            geometry_widget: false,
            default_width: -1,
            default_height: -1,
            default_is_geometry: false,
            resize: None,
            initial_position: None,
            position_constraints_changed: false,
            last: LastRequest::default(),
        }
    }
}

/// What the request builder needs to know about the window.
#[derive(Debug, Clone, Copy)]
pub struct WindowGeometry<'a> {
    pub info: Option<&'a GeometryInfo>,
    pub need_default_size: bool,
    pub need_default_position: bool,
    pub policy: PositionPolicy,
    pub gravity: Gravity,
    pub resizable: bool,
    /// Current allocation, `(0, 0)` based.
    pub allocation: Rect,
}

/// Where the pointer was when the window got placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    /// Root coordinates.
    pub position: PhysicalPosition<i32>,
    /// Whether the pointer is on the window's screen.
    pub same_screen: bool,
}

impl PointerSample {
    pub fn new(x: i32, y: i32) -> Self {
        PointerSample { position: PhysicalPosition::new(x, y), same_screen: true }
    }
}

/// What the request builder needs to know about the rest of the world.
#[derive(Debug, Clone, Copy)]
pub struct Surroundings<'a> {
    pub screen: &'a Screen,
    /// `None` if the pointer could not be queried.
    pub pointer: Option<PointerSample>,
    /// Origin and allocation of the transient parent, if it has one and it is mapped.
    pub parent: Option<Rect>,
}

impl Surroundings<'_> {
    /// The policy actually in force: centering on a parent needs a mapped parent.
    pub fn effective_policy(&self, policy: PositionPolicy) -> PositionPolicy {
        if policy == PositionPolicy::CenterOnParent && self.parent.is_none() {
            PositionPolicy::None
        } else {
            policy
        }
    }
}

/// Clamp that lets `high` win when the bounds are inverted.
fn clamp_max_wins(value: i32, low: i32, high: i32) -> i32 {
    if value > high {
        high
    } else if value < low {
        low
    } else {
        value
    }
}

/// Fit a span into another one: center it if it is too big, else move it inside.
pub fn clamp_span(base: i32, extent: i32, clamp_base: i32, clamp_extent: i32) -> i32 {
    if extent > clamp_extent {
        clamp_base + clamp_extent / 2 - extent / 2
    } else if base < clamp_base {
        clamp_base
    } else if base + extent > clamp_base + clamp_extent {
        clamp_base + clamp_extent - extent
    } else {
        base
    }
}

/// Move a `width × height` window at `(x, y)` into `rect`, each axis on its own.
pub fn clamp_window_to_rectangle(
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    rect: &Rect,
) -> (i32, i32) {
    (clamp_span(x, width, rect.x, rect.width), clamp_span(y, height, rect.y, rect.height))
}

/// Center a `width × height` window in `area`, never left of or above its origin.
pub fn center_in(area: &Rect, width: i32, height: i32) -> (i32, i32) {
    let x = (area.width - width) / 2 + area.x;
    let y = (area.height - height) / 2 + area.y;
    (x.max(area.x), y.max(area.y))
}

/// Center a window on the work area of the monitor under the pointer.
///
/// Without a usable pointer position, the middle monitor of the ordered list is used.
pub fn center_window_on_monitor(
    surroundings: &Surroundings<'_>,
    width: i32,
    height: i32,
) -> (i32, i32) {
    let screen = surroundings.screen;
    let monitor = match surroundings.pointer.filter(|pointer| pointer.same_screen) {
        Some(pointer) => screen.monitor_at_point(pointer.position.x, pointer.position.y),
        None => screen.n_monitors() / 2,
    };

    center_in(&screen.monitor_workarea(monitor), width, height)
}

/// Apply the standing position constraint of `policy` to a request.
pub fn constrain_position(
    policy: PositionPolicy,
    surroundings: &Surroundings<'_>,
    request: Rect,
) -> Rect {
    if policy != PositionPolicy::CenterAlways {
        return request;
    }

    let (x, y) = center_window_on_monitor(surroundings, request.width, request.height);
    Rect { x, y, ..request }
}

/// The size to request, before the hints are applied.
pub fn compute_configure_request_size(
    content: &dyn Content,
    window: &WindowGeometry<'_>,
    hints: &GeometryHints,
    screen: &Rect,
) -> (i32, i32) {
    let info = window.info;

    let (mut width, mut height) = if window.need_default_size {
        let (mut width, mut height) = guess_default_size(content, screen);

        // An empty window gets an arbitrary non-zero size.
        if width == 0 && height == 0 {
            width = 200;
            height = 200;
        }

        if let Some(info) = info {
            let default_width = (info.default_width > 0).then_some(info.default_width);
            let default_height = (info.default_height > 0).then_some(info.default_height);

            let (default_width, default_height) = if info.default_is_geometry {
                hints.size_to_pixels(default_width, default_height)
            } else {
                (default_width, default_height)
            };

            width = default_width.unwrap_or(width);
            height = default_height.unwrap_or(height);
        }

        (width, height)
    } else {
        (window.allocation.width, window.allocation.height)
    };

    if let Some(resize) = info.and_then(|info| info.resize) {
        let resize_width = (resize.width > 0).then_some(resize.width);
        let resize_height = (resize.height > 0).then_some(resize.height);

        let (resize_width, resize_height) = if resize.in_increments {
            hints.size_to_pixels(resize_width, resize_height)
        } else {
            (resize_width, resize_height)
        };

        width = resize_width.unwrap_or(width);
        height = resize_height.unwrap_or(height);
    }

    // Empty windows are not supported by the window system; round up here so the result stays
    // comparable with the allocation.
    (width.max(1), height.max(1))
}

/// Compute the configure request and hints for a window.
///
/// The position is the last requested one unless the window is being placed, in which case
/// the policy decides and an explicit initial position overrides it.
pub fn compute_configure_request(
    content: &mut dyn Content,
    window: &WindowGeometry<'_>,
    surroundings: &Surroundings<'_>,
) -> (Rect, GeometryHints) {
    let screen_rect = surroundings.screen.rect();
    let info = window.info;

    let hints = compute_hints(content, HintSettings {
        user: info.map(|info| &info.hints),
        geometry_widget: info.is_some_and(|info| info.geometry_widget),
        resizable: window.resizable,
        gravity: window.gravity,
        screen: &screen_rect,
    });

    let (width, height) = compute_configure_request_size(content, window, &hints, &screen_rect);
    let (width, height) = hints.constrain_size(width, height);

    let (mut x, mut y) = info.map(|info| (info.last.rect.x, info.last.rect.y)).unwrap_or((0, 0));

    if window.need_default_position {
        match surroundings.effective_policy(window.policy) {
            PositionPolicy::Center | PositionPolicy::CenterAlways => {
                (x, y) = center_window_on_monitor(surroundings, width, height);
            },
            PositionPolicy::CenterOnParent => {
                if let Some(parent) = surroundings.parent {
                    let screen = surroundings.screen;
                    let monitor = screen.monitor_geometry(screen.monitor_at_rect(&parent));

                    x = parent.x + (parent.width - width) / 2;
                    y = parent.y + (parent.height - height) / 2;
                    (x, y) = clamp_window_to_rectangle(x, y, width, height, &monitor);
                }
            },
            PositionPolicy::Mouse => {
                if let Some(pointer) = surroundings.pointer {
                    let PhysicalPosition { x: px, y: py } = pointer.position;

                    x = clamp_max_wins(px - width / 2, 0, screen_rect.width - width);
                    y = clamp_max_wins(py - height / 2, 0, screen_rect.height - height);

                    if pointer.same_screen {
                        let screen = surroundings.screen;
                        let monitor = screen.monitor_geometry(screen.monitor_at_point(px, py));
                        (x, y) = clamp_window_to_rectangle(x, y, width, height, &monitor);
                    }
                }
            },
            PositionPolicy::None => {},
        }

        if let Some(initial) = info.and_then(|info| info.initial_position) {
            let constrained = constrain_position(
                window.policy,
                surroundings,
                Rect::new(initial.x, initial.y, width, height),
            );
            (x, y) = (constrained.x, constrained.y);
        }
    }

    let request = Rect::new(x, y, width, height);
    trace!(?request, "computed configure request");
    (request, hints)
}
