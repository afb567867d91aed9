use std::cell::{Cell, RefCell};
use std::error::Error;
use std::rc::Rc;
use std::{fmt, mem};

use tracing::debug;

const PIXEL_SIZE: usize = mem::size_of::<u32>();

/// An error produced when using [`Icon::from_rgba`] with invalid arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadIcon {
    /// Produced when the length of the `rgba` argument isn't divisible by 4, thus `rgba` can't be
    /// safely interpreted as 32bpp RGBA pixels.
    ByteCountNotDivisibleBy4 { byte_count: usize },
    /// Produced when the number of pixels (`rgba.len() / 4`) isn't equal to `width * height`.
    DimensionsVsPixelCount { width: u32, height: u32, width_x_height: usize, pixel_count: usize },
}

impl fmt::Display for BadIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BadIcon::ByteCountNotDivisibleBy4 { byte_count } => write!(
                f,
                "The length of the `rgba` argument ({byte_count:?}) isn't divisible by 4, making \
                 it impossible to interpret as 32bpp RGBA pixels.",
            ),
            BadIcon::DimensionsVsPixelCount { width, height, width_x_height, pixel_count } => {
                write!(
                    f,
                    "The specified dimensions ({width:?}x{height:?}) don't match the number of \
                     pixels supplied by the `rgba` argument ({pixel_count:?}). For those \
                     dimensions, the expected pixel count is {width_x_height:?}.",
                )
            },
        }
    }
}

impl Error for BadIcon {}

/// An icon for the window titlebar, taskbar or a menu item.
///
/// Clones share the pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icon {
    width: u32,
    height: u32,
    rgba: Rc<[u8]>,
}

impl Icon {
    pub fn from_rgba(rgba: Vec<u8>, width: u32, height: u32) -> Result<Self, BadIcon> {
        if rgba.len() % PIXEL_SIZE != 0 {
            return Err(BadIcon::ByteCountNotDivisibleBy4 { byte_count: rgba.len() });
        }

        let pixel_count = rgba.len() / PIXEL_SIZE;
        let width_x_height = width as usize * height as usize;
        if pixel_count != width_x_height {
            Err(BadIcon::DimensionsVsPixelCount { width, height, width_x_height, pixel_count })
        } else {
            Ok(Icon { width, height, rgba: rgba.into() })
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn buffer(&self) -> &[u8] {
        &self.rgba
    }
}

/// Cancellation flag shared between an [`IconSlot`] and one of its loads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Default)]
struct SlotState {
    icon: Option<Icon>,
    pending: Option<CancelToken>,
}

/// Holds the icon of one item, loaded asynchronously.
///
/// At most one load is outstanding: starting a new load cancels the previous one, and a
/// cancelled load never replaces the icon.
#[derive(Debug, Clone, Default)]
pub struct IconSlot {
    state: Rc<RefCell<SlotState>>,
}

impl IconSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start loading a new icon, cancelling any outstanding load.
    pub fn begin_load(&self) -> IconLoad {
        let token = CancelToken::new();
        let previous = self.state.borrow_mut().pending.replace(token.clone());
        if let Some(previous) = previous {
            debug!("cancelling outstanding icon load");
            previous.cancel();
        }

        IconLoad { slot: self.clone(), token }
    }

    pub fn icon(&self) -> Option<Icon> {
        self.state.borrow().icon.clone()
    }

    /// Cancel the outstanding load, if any.
    pub fn cancel(&self) {
        if let Some(token) = self.state.borrow_mut().pending.take() {
            token.cancel();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().pending.is_some()
    }
}

/// An outstanding load started by [`IconSlot::begin_load`].
#[derive(Debug)]
pub struct IconLoad {
    slot: IconSlot,
    token: CancelToken,
}

impl IconLoad {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Deliver the result of the load.
    ///
    /// Returns whether the result was applied. A failed load (`None`) clears the icon.
    pub fn complete(self, icon: Option<Icon>) -> bool {
        if self.token.is_cancelled() {
            debug!("dropping the result of a cancelled icon load");
            return false;
        }

        let mut state = self.slot.state.borrow_mut();
        state.pending = None;
        state.icon = icon;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn icon(side: u32) -> Icon {
        Icon::from_rgba(vec![0; (side * side) as usize * PIXEL_SIZE], side, side).unwrap()
    }

    #[test]
    fn icon_buffer_is_validated() {
        assert_eq!(
            Icon::from_rgba(vec![0; 7], 1, 1),
            Err(BadIcon::ByteCountNotDivisibleBy4 { byte_count: 7 })
        );
        assert_eq!(
            Icon::from_rgba(vec![0; 8], 2, 2),
            Err(BadIcon::DimensionsVsPixelCount {
                width: 2,
                height: 2,
                width_x_height: 4,
                pixel_count: 2
            })
        );
        assert_eq!(icon(3).buffer().len(), 36);
    }

    #[test]
    fn new_load_cancels_the_previous_one() {
        let slot = IconSlot::new();
        let first = slot.begin_load();
        let second = slot.begin_load();
        assert!(first.is_cancelled());

        assert!(!first.complete(Some(icon(1))));
        assert_eq!(slot.icon(), None);
        assert!(slot.is_loading());

        assert!(second.complete(Some(icon(2))));
        assert_eq!(slot.icon().map(|icon| icon.width()), Some(2));
        assert!(!slot.is_loading());
    }

    #[test]
    fn failed_load_leaves_no_icon() {
        let slot = IconSlot::new();
        assert!(slot.begin_load().complete(Some(icon(1))));
        assert!(slot.begin_load().complete(None));
        assert_eq!(slot.icon(), None);
    }

    #[test]
    fn explicit_cancel() {
        let slot = IconSlot::new();
        let load = slot.begin_load();
        slot.cancel();
        assert!(!load.complete(Some(icon(1))));
        assert!(!slot.is_loading());
    }
}
