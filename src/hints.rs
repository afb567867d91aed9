//! Deriving the geometry hints of a toplevel window from its content.

use toplevel_core::geometry::{Gravity, Rect};
use toplevel_core::hints::{GeometryHints, HintFlags};
use tracing::warn;

use crate::content::Content;

/// Size the geometry widget is forced to while measuring the border around it.
///
/// Must be bigger than any real widget.
pub const PROBE_SIZE: i32 = 10_000;

/// Largest default size guessed for a landscape screen. Swapped for portrait screens.
pub const MAX_DEFAULT_WIDTH: i32 = 640;
pub const MAX_DEFAULT_HEIGHT: i32 = 480;

/// A reasonable initial size for `content` on a screen of the given size.
///
/// The screen is capped at 640×480 (480×640 when in portrait orientation), then each axis is
/// clamped to lie between the content's minimum and natural size, minimum winning.
pub fn guess_default_size(content: &dyn Content, screen: &Rect) -> (i32, i32) {
    let (mut width, mut height) = (screen.width, screen.height);

    if width >= height {
        width = width.min(MAX_DEFAULT_WIDTH);
        height = height.min(MAX_DEFAULT_HEIGHT);
    } else {
        width = width.min(MAX_DEFAULT_HEIGHT);
        height = height.min(MAX_DEFAULT_WIDTH);
    }

    let (minimum, natural) = content.preferred_width();
    width = minimum.max(width.min(natural));

    let (minimum, natural) = content.preferred_height_for_width(width);
    height = minimum.max(height.min(natural));

    (width, height)
}

/// Inputs of [`compute_hints`] that belong to the window rather than its content.
#[derive(Debug, Clone, Copy)]
pub struct HintSettings<'a> {
    /// Hints set by the application, if any.
    pub user: Option<&'a GeometryHints>,
    /// The user hints refer to a geometry widget inside the content.
    pub geometry_widget: bool,
    pub resizable: bool,
    pub gravity: Gravity,
    /// The screen, used to guess the size of non-resizable windows.
    pub screen: &'a Rect,
}

/// Compute the hints to advertise for a window.
///
/// Hints given by the application may refer to a geometry widget inside the content. In that
/// case the border around the widget is measured by forcing the widget to [`PROBE_SIZE`] and
/// added to the base, minimum and maximum sizes.
///
/// The result never has [`HintFlags::POS`] set, always has `BASE_SIZE`, `MIN_SIZE` and
/// `WIN_GRAVITY` set, and has `MAX_SIZE` set for windows that are not resizable.
pub fn compute_hints(content: &mut dyn Content, settings: HintSettings<'_>) -> GeometryHints {
    let (mut req_width, mut req_height) = content.minimum_size();

    let mut hints = settings.user.copied().unwrap_or_default();
    if settings.user.is_none() {
        hints.flags = HintFlags::empty();
    }

    let (mut extra_width, mut extra_height) = (0, 0);
    if settings.geometry_widget {
        if let Some((probe_width, probe_height)) = content.probe_geometry_widget(PROBE_SIZE) {
            extra_width = probe_width - PROBE_SIZE;
            extra_height = probe_height - PROBE_SIZE;

            if extra_width < 0 || extra_height < 0 {
                warn!(
                    "toplevel size doesn't seem to depend on the size of the geometry widget; \
                     the widget might not be inside the window"
                );
                extra_width = extra_width.max(0);
                extra_height = extra_height.max(0);
            }
        }
    }

    if hints.flags.contains(HintFlags::BASE_SIZE) {
        hints.base_width += extra_width;
        hints.base_height += extra_height;
    } else {
        hints.flags |= HintFlags::BASE_SIZE;
        hints.base_width = extra_width;
        hints.base_height = extra_height;

        // Without a base size, the window system uses the minimum size in its place.
        if hints.flags.contains(HintFlags::MIN_SIZE) {
            if hints.min_width > 0 {
                hints.base_width += hints.min_width;
            }
            if hints.min_height > 0 {
                hints.base_height += hints.min_height;
            }
        }
    }

    // Fixed-size windows get a good size, not the minimum one.
    if !settings.resizable {
        (req_width, req_height) = guess_default_size(content, settings.screen);
    }

    if hints.flags.contains(HintFlags::MIN_SIZE) {
        hints.min_width = if hints.min_width < 0 {
            req_width
        } else {
            req_width.max(hints.min_width + extra_width)
        };
        hints.min_height = if hints.min_height < 0 {
            req_height
        } else {
            req_height.max(hints.min_height + extra_height)
        };
    } else {
        hints.flags |= HintFlags::MIN_SIZE;
        hints.min_width = req_width;
        hints.min_height = req_height;
    }

    if hints.flags.contains(HintFlags::MAX_SIZE) {
        if hints.max_width < 0 {
            hints.max_width = req_width;
        } else {
            hints.max_width += extra_width;
        }
        if hints.max_height < 0 {
            hints.max_height = req_height;
        } else {
            hints.max_height += extra_height;
        }
    } else if !settings.resizable {
        hints.flags |= HintFlags::MAX_SIZE;
        hints.max_width = req_width;
        hints.max_height = req_height;
    }

    hints.flags.remove(HintFlags::POS);
    hints.flags |= HintFlags::WIN_GRAVITY;
    hints.win_gravity = settings.gravity;

    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::FixedContent;

    const SCREEN: Rect = Rect::from_size(1920, 1080);

    fn settings(user: Option<&GeometryHints>, resizable: bool) -> HintSettings<'_> {
        HintSettings {
            user,
            geometry_widget: user.is_some(),
            resizable,
            gravity: Gravity::NorthWest,
            screen: &SCREEN,
        }
    }

    #[test]
    fn default_size_is_capped_by_orientation() {
        let content = FixedContent::with_natural((10, 10), (5000, 5000));
        assert_eq!(guess_default_size(&content, &SCREEN), (640, 480));
        assert_eq!(guess_default_size(&content, &Rect::from_size(1080, 1920)), (480, 640));
        assert_eq!(guess_default_size(&content, &Rect::from_size(600, 400)), (600, 400));
    }

    #[test]
    fn default_size_respects_minimum_and_natural() {
        let content = FixedContent::with_natural((700, 100), (900, 200));
        assert_eq!(guess_default_size(&content, &SCREEN), (700, 200));
    }

    #[test]
    fn hints_without_user_input() {
        let mut content = FixedContent::with_natural((300, 200), (400, 300));
        let hints = compute_hints(&mut content, settings(None, true));

        assert_eq!(
            hints.flags,
            HintFlags::BASE_SIZE | HintFlags::MIN_SIZE | HintFlags::WIN_GRAVITY
        );
        assert_eq!((hints.base_width, hints.base_height), (0, 0));
        assert_eq!((hints.min_width, hints.min_height), (300, 200));
    }

    #[test]
    fn fixed_size_windows_get_a_maximum() {
        let mut content = FixedContent::with_natural((300, 200), (400, 300));
        let hints = compute_hints(&mut content, settings(None, false));

        assert!(hints.flags.contains(HintFlags::MAX_SIZE));
        assert_eq!((hints.min_width, hints.min_height), (400, 300));
        assert_eq!((hints.max_width, hints.max_height), (400, 300));
    }

    #[test]
    fn negative_user_bounds_mean_requisition() {
        let mut content = FixedContent::new(120, 80);
        let user = GeometryHints::default().with_min_size(-1, 50).with_max_size(-1, 600);
        let hints = compute_hints(&mut content, settings(Some(&user), true));

        assert_eq!((hints.min_width, hints.min_height), (120, 80));
        assert_eq!((hints.max_width, hints.max_height), (120, 600));
        // Base falls back to the positive part of the user minimum.
        assert_eq!((hints.base_width, hints.base_height), (0, 50));
    }

    #[test]
    fn geometry_widget_border_is_added() {
        let mut content = FixedContent::new(100, 100).with_geometry_widget(20, 40);
        let user = GeometryHints::default()
            .with_base_size(2, 4)
            .with_min_size(10, 10)
            .with_max_size(500, 500)
            .with_resize_increments(8, 16);
        let hints = compute_hints(&mut content, settings(Some(&user), true));

        assert_eq!((hints.base_width, hints.base_height), (22, 44));
        assert_eq!((hints.min_width, hints.min_height), (100, 100));
        assert_eq!((hints.max_width, hints.max_height), (520, 540));
        assert_eq!((hints.width_inc, hints.height_inc), (8, 16));
    }

    #[test]
    fn shrinking_border_is_clamped() {
        let mut content = FixedContent::new(50, 50).with_geometry_widget(-10, 5);
        let user = GeometryHints::default();
        let hints = compute_hints(&mut content, settings(Some(&user), true));
        assert_eq!((hints.base_width, hints.base_height), (0, 5));
    }

    #[test]
    fn position_flag_is_never_computed() {
        let mut content = FixedContent::new(10, 10);
        let mut user = GeometryHints::default();
        user.flags |= HintFlags::POS | HintFlags::USER_POS;
        let hints = compute_hints(&mut content, settings(Some(&user), true));
        assert!(!hints.flags.contains(HintFlags::POS));
        assert!(hints.flags.contains(HintFlags::USER_POS));
    }
}
