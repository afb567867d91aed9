//! Geometry hints advertised to the window manager.
//!
//! A [`GeometryHints`] record carries a [`HintFlags`] mask saying which of its fields are
//! meaningful. Fields whose flag is clear are ignored by [`GeometryHints::constrain_size`], by
//! [`GeometryHints::size_to_pixels`] and by equality.

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Gravity;

bitflags! {
    /// Which fields of [`GeometryHints`] are set.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct HintFlags: u32 {
        /// The requested position should be honored.
        const POS = 1 << 0;
        const MIN_SIZE = 1 << 1;
        const MAX_SIZE = 1 << 2;
        const BASE_SIZE = 1 << 3;
        const ASPECT = 1 << 4;
        const RESIZE_INC = 1 << 5;
        const WIN_GRAVITY = 1 << 6;
        /// The position was chosen by the user.
        const USER_POS = 1 << 7;
        /// The size was chosen by the user.
        const USER_SIZE = 1 << 8;
    }
}

/// Size constraints for a toplevel window.
///
/// A negative `min_*` or `max_*` in a user-supplied record means "use the window's own
/// requisition" and is resolved when the hints are computed.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeometryHints {
    pub flags: HintFlags,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub base_width: i32,
    pub base_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub win_gravity: Gravity,
}

impl Default for GeometryHints {
    fn default() -> Self {
        GeometryHints {
            flags: HintFlags::empty(),
            min_width: 0,
            min_height: 0,
            max_width: 0,
            max_height: 0,
            base_width: 0,
            base_height: 0,
            width_inc: 1,
            height_inc: 1,
            min_aspect: 0.0,
            max_aspect: 0.0,
            win_gravity: Gravity::NorthWest,
        }
    }
}

impl PartialEq for GeometryHints {
    fn eq(&self, other: &Self) -> bool {
        let flags = self.flags;
        if flags != other.flags {
            return false;
        }

        if flags.contains(HintFlags::MIN_SIZE)
            && (self.min_width != other.min_width || self.min_height != other.min_height)
        {
            return false;
        }

        if flags.contains(HintFlags::MAX_SIZE)
            && (self.max_width != other.max_width || self.max_height != other.max_height)
        {
            return false;
        }

        if flags.contains(HintFlags::BASE_SIZE)
            && (self.base_width != other.base_width || self.base_height != other.base_height)
        {
            return false;
        }

        if flags.contains(HintFlags::ASPECT)
            && (self.min_aspect != other.min_aspect || self.max_aspect != other.max_aspect)
        {
            return false;
        }

        if flags.contains(HintFlags::RESIZE_INC)
            && (self.width_inc != other.width_inc || self.height_inc != other.height_inc)
        {
            return false;
        }

        if flags.contains(HintFlags::WIN_GRAVITY) && self.win_gravity != other.win_gravity {
            return false;
        }

        true
    }
}

/// `((int) (value / base)) * base`, truncating toward zero.
#[inline]
fn floor_to(value: f64, base: i32) -> i32 {
    ((value / base as f64) as i32) * base
}

/// Clamp that lets `high` win when the bounds are inverted.
#[inline]
fn clamp_max_wins(value: i32, low: i32, high: i32) -> i32 {
    if value > high {
        high
    } else if value < low {
        low
    } else {
        value
    }
}

impl GeometryHints {
    pub fn with_min_size(mut self, width: i32, height: i32) -> Self {
        self.flags |= HintFlags::MIN_SIZE;
        self.min_width = width;
        self.min_height = height;
        self
    }

    pub fn with_max_size(mut self, width: i32, height: i32) -> Self {
        self.flags |= HintFlags::MAX_SIZE;
        self.max_width = width;
        self.max_height = height;
        self
    }

    pub fn with_base_size(mut self, width: i32, height: i32) -> Self {
        self.flags |= HintFlags::BASE_SIZE;
        self.base_width = width;
        self.base_height = height;
        self
    }

    pub fn with_resize_increments(mut self, width_inc: i32, height_inc: i32) -> Self {
        self.flags |= HintFlags::RESIZE_INC;
        self.width_inc = width_inc;
        self.height_inc = height_inc;
        self
    }

    pub fn with_aspect(mut self, min_aspect: f64, max_aspect: f64) -> Self {
        self.flags |= HintFlags::ASPECT;
        self.min_aspect = min_aspect;
        self.max_aspect = max_aspect;
        self
    }

    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.flags |= HintFlags::WIN_GRAVITY;
        self.win_gravity = gravity;
        self
    }

    /// Convert a size given in resize increments to pixels.
    ///
    /// Each axis becomes `max(n * inc + base, min)`, where unset fields count as `inc = 1`,
    /// `base = 0` and `min = 0`.
    pub fn size_to_pixels(
        &self,
        width: Option<i32>,
        height: Option<i32>,
    ) -> (Option<i32>, Option<i32>) {
        let (base_width, base_height) = if self.flags.contains(HintFlags::BASE_SIZE) {
            (self.base_width, self.base_height)
        } else {
            (0, 0)
        };
        let (min_width, min_height) = if self.flags.contains(HintFlags::MIN_SIZE) {
            (self.min_width, self.min_height)
        } else {
            (0, 0)
        };
        let (width_inc, height_inc) = if self.flags.contains(HintFlags::RESIZE_INC) {
            (self.width_inc, self.height_inc)
        } else {
            (1, 1)
        };

        (
            width.map(|w| (w * width_inc + base_width).max(min_width)),
            height.map(|h| (h * height_inc + base_height).max(min_height)),
        )
    }

    /// Apply these hints to a size the way a window manager would.
    ///
    /// The size is clamped to `[min, max]` (max wins on conflict), snapped down to
    /// `base + n * inc`, and finally adjusted along one axis so that
    /// `min_aspect <= width / height <= max_aspect` when an aspect range is set. An aspect
    /// adjustment that would leave the min/max bounds is skipped.
    pub fn constrain_size(&self, width: i32, height: i32) -> (i32, i32) {
        let flags = self.flags;

        let (base_width, base_height, min_width, min_height) =
            match (flags.contains(HintFlags::BASE_SIZE), flags.contains(HintFlags::MIN_SIZE)) {
                (true, true) => {
                    (self.base_width, self.base_height, self.min_width, self.min_height)
                },
                (true, false) => {
                    (self.base_width, self.base_height, self.base_width, self.base_height)
                },
                (false, true) => {
                    (self.min_width, self.min_height, self.min_width, self.min_height)
                },
                (false, false) => (0, 0, 0, 0),
            };

        let (max_width, max_height) = if flags.contains(HintFlags::MAX_SIZE) {
            (self.max_width, self.max_height)
        } else {
            (i32::MAX, i32::MAX)
        };

        let (xinc, yinc) = if flags.contains(HintFlags::RESIZE_INC) {
            (self.width_inc.max(1), self.height_inc.max(1))
        } else {
            (1, 1)
        };

        let mut width = clamp_max_wins(width, min_width, max_width);
        let mut height = clamp_max_wins(height, min_height, max_height);

        // Shrink to base + N * inc.
        width = base_width + floor_to((width - base_width) as f64, xinc);
        height = base_height + floor_to((height - base_height) as f64, yinc);

        if flags.contains(HintFlags::ASPECT) && self.min_aspect > 0.0 && self.max_aspect > 0.0 {
            if self.min_aspect * height as f64 > width as f64 {
                let delta = floor_to(height as f64 - width as f64 / self.min_aspect, yinc);
                if height - delta >= min_height {
                    height -= delta;
                } else {
                    let delta = floor_to(height as f64 * self.min_aspect - width as f64, xinc);
                    if width + delta <= max_width {
                        width += delta;
                    }
                }
            }

            if self.max_aspect * (height as f64) < width as f64 {
                let delta = floor_to(width as f64 - height as f64 * self.max_aspect, xinc);
                if width - delta >= min_width {
                    width -= delta;
                } else {
                    let delta = floor_to(width as f64 / self.max_aspect - height as f64, yinc);
                    if height + delta <= max_height {
                        height += delta;
                    }
                }
            }
        }

        (width, height)
    }
}
