//! Window, modifier and event-selection masks.

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

bitflags! {
    /// State of a toplevel window as reported by the window system.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct WindowState: u32 {
        const WITHDRAWN = 1 << 0;
        const ICONIFIED = 1 << 1;
        const MAXIMIZED = 1 << 2;
        const STICKY = 1 << 3;
        const FULLSCREEN = 1 << 4;
        const ABOVE = 1 << 5;
        const BELOW = 1 << 6;
        const FOCUSED = 1 << 7;
    }
}

bitflags! {
    /// Keyboard modifiers, pointer buttons and keyboard group, in X11 layout.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ModifierType: u32 {
        const SHIFT = 1 << 0;
        const LOCK = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1 = 1 << 3;
        const MOD2 = 1 << 4;
        const MOD3 = 1 << 5;
        const MOD4 = 1 << 6;
        const MOD5 = 1 << 7;
        const BUTTON1 = 1 << 8;
        const BUTTON2 = 1 << 9;
        const BUTTON3 = 1 << 10;
        const BUTTON4 = 1 << 11;
        const BUTTON5 = 1 << 12;
        /// Low bit of the effective keyboard group.
        const GROUP_LOW = 1 << 13;
        /// High bit of the effective keyboard group.
        const GROUP_HIGH = 1 << 14;

        const _ = !0;
    }
}

impl ModifierType {
    pub const GROUP_SHIFT: u32 = 13;

    /// Mask for the numbered pointer button, `None` outside `1..=5`.
    pub fn button(button: u32) -> Option<Self> {
        match button {
            1 => Some(Self::BUTTON1),
            2 => Some(Self::BUTTON2),
            3 => Some(Self::BUTTON3),
            4 => Some(Self::BUTTON4),
            5 => Some(Self::BUTTON5),
            _ => None,
        }
    }

    /// The keyboard group encoded in this state.
    pub fn group(self) -> u32 {
        (self.bits() >> Self::GROUP_SHIFT) & 0x3
    }
}

bitflags! {
    /// Events a client wants delivered for a window.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const POINTER_MOTION = 1 << 2;
        const POINTER_MOTION_HINT = 1 << 3;
        const BUTTON_MOTION = 1 << 4;
        const BUTTON1_MOTION = 1 << 5;
        const BUTTON2_MOTION = 1 << 6;
        const BUTTON3_MOTION = 1 << 7;
        const BUTTON_PRESS = 1 << 8;
        const BUTTON_RELEASE = 1 << 9;
        const KEY_PRESS = 1 << 10;
        const KEY_RELEASE = 1 << 11;
        const ENTER_NOTIFY = 1 << 12;
        const LEAVE_NOTIFY = 1 << 13;
        const FOCUS_CHANGE = 1 << 14;
        const SCROLL = 1 << 21;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_round_trips_through_bits() {
        let state = ModifierType::from_bits_retain(2 << ModifierType::GROUP_SHIFT)
            | ModifierType::SHIFT;
        assert_eq!(state.group(), 2);
        assert!(state.contains(ModifierType::GROUP_HIGH));
    }

    #[test]
    fn buttons_outside_range_have_no_mask() {
        assert_eq!(ModifierType::button(0), None);
        assert_eq!(ModifierType::button(3), Some(ModifierType::BUTTON3));
        assert_eq!(ModifierType::button(6), None);
    }
}
