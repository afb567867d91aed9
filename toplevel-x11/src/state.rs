//! `_NET_WM_STATE` encoding.

use toplevel_core::state::WindowState;
use x11rb::protocol::xproto;

use crate::atoms::Atoms;

/// `_NET_WM_STATE_REMOVE` or `_NET_WM_STATE_ADD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateOperation {
    Remove = 0,
    Add = 1,
}

impl From<bool> for StateOperation {
    fn from(op: bool) -> Self {
        if op {
            StateOperation::Add
        } else {
            StateOperation::Remove
        }
    }
}

/// The `_NET_WM_STATE_*` atoms mirrored by [`WindowState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateAtoms {
    pub hidden: xproto::Atom,
    pub maximized_horz: xproto::Atom,
    pub maximized_vert: xproto::Atom,
    pub sticky: xproto::Atom,
    pub fullscreen: xproto::Atom,
    pub above: xproto::Atom,
    pub below: xproto::Atom,
    pub focused: xproto::Atom,
}

impl StateAtoms {
    pub(crate) fn new(atoms: &Atoms) -> Self {
        StateAtoms {
            hidden: atoms._NET_WM_STATE_HIDDEN,
            maximized_horz: atoms._NET_WM_STATE_MAXIMIZED_HORZ,
            maximized_vert: atoms._NET_WM_STATE_MAXIMIZED_VERT,
            sticky: atoms._NET_WM_STATE_STICKY,
            fullscreen: atoms._NET_WM_STATE_FULLSCREEN,
            above: atoms._NET_WM_STATE_ABOVE,
            below: atoms._NET_WM_STATE_BELOW,
            focused: atoms._NET_WM_STATE_FOCUSED,
        }
    }

    /// Read a `_NET_WM_STATE` property. Unknown atoms are ignored.
    ///
    /// A window is maximized only when it is maximized in both directions.
    pub fn decode(&self, atoms: &[xproto::Atom]) -> WindowState {
        let mut state = WindowState::empty();
        let has = |atom| atoms.contains(&atom);

        state.set(WindowState::ICONIFIED, has(self.hidden));
        state.set(WindowState::MAXIMIZED, has(self.maximized_horz) && has(self.maximized_vert));
        state.set(WindowState::STICKY, has(self.sticky));
        state.set(WindowState::FULLSCREEN, has(self.fullscreen));
        state.set(WindowState::ABOVE, has(self.above));
        state.set(WindowState::BELOW, has(self.below));
        state.set(WindowState::FOCUSED, has(self.focused));
        state
    }

    /// The property value to set on a window before it is mapped.
    ///
    /// Only the states a client may ask for are written.
    pub fn encode(&self, state: WindowState) -> Vec<xproto::Atom> {
        let mut atoms = Vec::new();
        if state.contains(WindowState::MAXIMIZED) {
            atoms.extend([self.maximized_horz, self.maximized_vert]);
        }
        if state.contains(WindowState::STICKY) {
            atoms.push(self.sticky);
        }
        if state.contains(WindowState::FULLSCREEN) {
            atoms.push(self.fullscreen);
        }
        if state.contains(WindowState::ABOVE) {
            atoms.push(self.above);
        }
        if state.contains(WindowState::BELOW) {
            atoms.push(self.below);
        }
        atoms
    }

    /// The two atoms of a `_NET_WM_STATE` client message for a single state.
    ///
    /// Returns `None` for states that are not changed through `_NET_WM_STATE`.
    pub fn request(&self, state: WindowState) -> Option<(xproto::Atom, xproto::Atom)> {
        [
            (WindowState::MAXIMIZED, (self.maximized_horz, self.maximized_vert)),
            (WindowState::STICKY, (self.sticky, 0)),
            (WindowState::FULLSCREEN, (self.fullscreen, 0)),
            (WindowState::ABOVE, (self.above, 0)),
            (WindowState::BELOW, (self.below, 0)),
        ]
        .into_iter()
        .find_map(|(flag, atoms)| (flag == state).then_some(atoms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms() -> StateAtoms {
        StateAtoms {
            hidden: 301,
            maximized_horz: 302,
            maximized_vert: 303,
            sticky: 304,
            fullscreen: 305,
            above: 306,
            below: 307,
            focused: 308,
        }
    }

    #[test]
    fn half_maximized_is_not_maximized() {
        let atoms = atoms();
        assert_eq!(atoms.decode(&[302]), WindowState::empty());
        assert_eq!(atoms.decode(&[303, 302, 999]), WindowState::MAXIMIZED);
        assert_eq!(atoms.decode(&[301, 308]), WindowState::ICONIFIED | WindowState::FOCUSED);
    }

    #[test]
    fn encoding_skips_manager_owned_states() {
        let atoms = atoms();
        let state = WindowState::MAXIMIZED | WindowState::FOCUSED | WindowState::ICONIFIED;
        assert_eq!(atoms.encode(state), vec![302, 303]);
        assert_eq!(atoms.decode(&atoms.encode(WindowState::ABOVE)), WindowState::ABOVE);
    }

    #[test]
    fn only_client_states_have_requests() {
        let atoms = atoms();
        assert_eq!(atoms.request(WindowState::MAXIMIZED), Some((302, 303)));
        assert_eq!(atoms.request(WindowState::BELOW), Some((307, 0)));
        assert_eq!(atoms.request(WindowState::ICONIFIED), None);
        assert_eq!(atoms.request(WindowState::MAXIMIZED | WindowState::STICKY), None);
        assert_eq!(StateOperation::from(true) as u32, 1);
    }
}
