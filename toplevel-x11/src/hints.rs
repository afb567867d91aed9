//! `WM_NORMAL_HINTS` encoding.

use toplevel_core::geometry::Gravity;
use toplevel_core::hints::{GeometryHints, HintFlags};
use x11rb::properties::{AspectRatio, WmSizeHints, WmSizeHintsSpecification};
use x11rb::protocol::xproto;

/// Fixed-point denominator of aspect ratios.
const ASPECT_UNIT: f64 = 65536.0;

/// Build the `WM_NORMAL_HINTS` property for a set of geometry hints.
///
/// The position and size fields are obsolete in ICCCM; only their flags are meaningful, and the
/// window manager reads the actual geometry from the window.
pub fn normal_hints(hints: &GeometryHints) -> WmSizeHints {
    let flags = hints.flags;
    let mut size_hints = WmSizeHints::new();

    if flags.contains(HintFlags::USER_POS) {
        size_hints.position = Some((WmSizeHintsSpecification::UserSpecified, 0, 0));
    } else if flags.contains(HintFlags::POS) {
        size_hints.position = Some((WmSizeHintsSpecification::ProgramSpecified, 0, 0));
    }

    if flags.contains(HintFlags::USER_SIZE) {
        size_hints.size = Some((WmSizeHintsSpecification::UserSpecified, 0, 0));
    }

    if flags.contains(HintFlags::MIN_SIZE) {
        size_hints.min_size = Some((hints.min_width.max(1), hints.min_height.max(1)));
    }

    if flags.contains(HintFlags::MAX_SIZE) {
        size_hints.max_size = Some((hints.max_width.max(1), hints.max_height.max(1)));
    }

    if flags.contains(HintFlags::BASE_SIZE) {
        size_hints.base_size = Some((hints.base_width, hints.base_height));
    }

    if flags.contains(HintFlags::RESIZE_INC) {
        size_hints.size_increment = Some((hints.width_inc.max(1), hints.height_inc.max(1)));
    }

    if flags.contains(HintFlags::ASPECT) {
        size_hints.aspect = Some((aspect_ratio(hints.min_aspect), aspect_ratio(hints.max_aspect)));
    }

    if flags.contains(HintFlags::WIN_GRAVITY) {
        size_hints.win_gravity = Some(x_gravity(hints.win_gravity));
    }

    size_hints
}

/// Express `aspect` as a fraction with one side fixed at 65536.
fn aspect_ratio(aspect: f64) -> AspectRatio {
    if aspect <= 1.0 {
        AspectRatio::new((ASPECT_UNIT * aspect) as i32, ASPECT_UNIT as i32)
    } else {
        AspectRatio::new(ASPECT_UNIT as i32, (ASPECT_UNIT / aspect) as i32)
    }
}

pub(crate) fn x_gravity(gravity: Gravity) -> xproto::Gravity {
    match gravity {
        Gravity::NorthWest => xproto::Gravity::NORTH_WEST,
        Gravity::North => xproto::Gravity::NORTH,
        Gravity::NorthEast => xproto::Gravity::NORTH_EAST,
        Gravity::West => xproto::Gravity::WEST,
        Gravity::Center => xproto::Gravity::CENTER,
        Gravity::East => xproto::Gravity::EAST,
        Gravity::SouthWest => xproto::Gravity::SOUTH_WEST,
        Gravity::South => xproto::Gravity::SOUTH,
        Gravity::SouthEast => xproto::Gravity::SOUTH_EAST,
        Gravity::Static => xproto::Gravity::STATIC,
    }
}
