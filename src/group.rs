//! Window groups and the grabs they hold.
//!
//! A grab confines input to one widget. Grabs are scoped to a group so that independent sets of
//! windows (an application and a modal dialog of another document, say) do not block each other.
//! Windows without an explicit group share the context's default group.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::context::Context;
use crate::keys::WidgetId;
use crate::window::{Window, WindowId};

/// A widget that can hold a grab: a window plus the path to the widget inside its content.
///
/// An empty path designates the window itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrabTarget {
    pub toplevel: WindowId,
    pub widget_path: Vec<WidgetId>,
}

impl GrabTarget {
    /// The window itself.
    pub fn window(toplevel: WindowId) -> Self {
        GrabTarget { toplevel, widget_path: Vec::new() }
    }

    pub fn widget(toplevel: WindowId, widget_path: Vec<WidgetId>) -> Self {
        GrabTarget { toplevel, widget_path }
    }

    /// Whether `self` lies strictly inside `ancestor`.
    pub fn is_ancestor(&self, ancestor: &GrabTarget) -> bool {
        self.toplevel == ancestor.toplevel
            && self.widget_path.len() > ancestor.widget_path.len()
            && self.widget_path.starts_with(&ancestor.widget_path)
    }
}

/// An input device, e.g. a pointer, with the keyboard it is paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub id: u16,
    /// The associated device: the keyboard of a pointer or the pointer of a keyboard.
    pub paired: Option<u16>,
}

impl Device {
    pub fn new(id: u16, paired: Option<u16>) -> Self {
        Device { id, paired }
    }

    /// Whether `id` is this device or the device paired with it.
    fn is_pair_of(&self, id: u16) -> bool {
        self.id == id || self.paired == Some(id)
    }
}

/// A grab held by a single device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGrab {
    pub target: GrabTarget,
    pub device: Device,
    /// Block the other devices from the grabbed widget and its children.
    pub block_others: bool,
}

#[derive(Debug, Default)]
struct GroupState {
    /// Most recent last.
    grabs: Vec<GrabTarget>,
    /// Most recent last.
    device_grabs: Vec<DeviceGrab>,
}

/// A set of windows sharing grabs.
///
/// Cheap to clone; clones refer to the same group.
#[derive(Clone, Default)]
pub struct WindowGroup {
    state: Rc<RefCell<GroupState>>,
}

impl WindowGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `window` into this group, dropping the grabs it held in its previous group.
    pub fn add_window(&self, window: &Window) {
        match window.explicit_group() {
            Some(group) if group == *self => return,
            Some(group) => group.remove_window(window),
            None => window.context().default_group().cleanup_grabs(window.id()),
        }

        window.set_explicit_group(Some(self.clone()));
    }

    /// Remove `window` from this group, dropping its grabs.
    pub fn remove_window(&self, window: &Window) {
        if window.explicit_group().as_ref() != Some(self) {
            debug_assert!(false, "window is not in this group");
            warn!(id = ?window.id(), "removing a window from a group it is not in");
            return;
        }

        self.cleanup_grabs(window.id());
        window.set_explicit_group(None);
    }

    /// The live windows of this group, in creation order.
    pub fn list_windows(&self, context: &Context) -> Vec<Window> {
        context.list_toplevels().into_iter().filter(|window| window.group() == *self).collect()
    }

    /// Drop every grab held by a widget of `toplevel`.
    pub(crate) fn cleanup_grabs(&self, toplevel: WindowId) {
        let mut state = self.state.borrow_mut();
        let before = state.grabs.len() + state.device_grabs.len();

        state.grabs.retain(|grab| grab.toplevel != toplevel);
        state.device_grabs.retain(|grab| grab.target.toplevel != toplevel);

        let removed = before - state.grabs.len() - state.device_grabs.len();
        if removed > 0 {
            debug!(?toplevel, removed, "dropped grabs of window");
        }
    }

    pub fn add_grab(&self, target: GrabTarget) {
        self.state.borrow_mut().grabs.push(target);
    }

    /// Remove the most recent grab of `target`.
    pub fn remove_grab(&self, target: &GrabTarget) -> bool {
        let mut state = self.state.borrow_mut();
        match state.grabs.iter().rposition(|grab| grab == target) {
            Some(index) => {
                state.grabs.remove(index);
                true
            },
            None => false,
        }
    }

    pub fn current_grab(&self) -> Option<GrabTarget> {
        self.state.borrow().grabs.last().cloned()
    }

    pub fn add_device_grab(&self, target: GrabTarget, device: Device, block_others: bool) {
        self.state.borrow_mut().device_grabs.push(DeviceGrab { target, device, block_others });
    }

    /// Remove the most recent grab of `target` by `device` or the device paired with it.
    pub fn remove_device_grab(&self, target: &GrabTarget, device: Device) -> bool {
        let mut state = self.state.borrow_mut();
        let found = state
            .device_grabs
            .iter()
            .rposition(|grab| grab.target == *target && device.is_pair_of(grab.device.id));

        match found {
            Some(index) => {
                state.device_grabs.remove(index);
                true
            },
            None => false,
        }
    }

    /// The widget currently grabbed by `device` or the device paired with it.
    pub fn current_device_grab(&self, device: Device) -> Option<GrabTarget> {
        self.state
            .borrow()
            .device_grabs
            .iter()
            .rev()
            .find(|grab| device.is_pair_of(grab.device.id))
            .map(|grab| grab.target.clone())
    }

    /// Whether another device pair holds a blocking grab on `target` or one of its ancestors.
    pub fn is_blocked_for_device(&self, target: &GrabTarget, device: Device) -> bool {
        self.state.borrow().device_grabs.iter().any(|grab| {
            grab.block_others
                && !device.is_pair_of(grab.device.id)
                && (grab.target == *target || target.is_ancestor(&grab.target))
        })
    }
}

impl PartialEq for WindowGroup {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Eq for WindowGroup {}

impl fmt::Debug for WindowGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("WindowGroup")
            .field("grabs", &state.grabs.len())
            .field("device_grabs", &state.device_grabs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POINTER: Device = Device { id: 2, paired: Some(3) };
    const KEYBOARD: Device = Device { id: 3, paired: Some(2) };
    const TABLET: Device = Device { id: 9, paired: None };

    fn target(toplevel: u64, path: &[u64]) -> GrabTarget {
        GrabTarget::widget(WindowId(toplevel), path.iter().copied().map(WidgetId).collect())
    }

    #[test]
    fn ancestry_is_strict_and_per_window() {
        let outer = target(1, &[4]);
        let inner = target(1, &[4, 7]);
        assert!(inner.is_ancestor(&outer));
        assert!(!outer.is_ancestor(&inner));
        assert!(!outer.is_ancestor(&outer));
        assert!(!target(2, &[4, 7]).is_ancestor(&outer));
    }

    #[test]
    fn plain_grabs_stack() {
        let group = WindowGroup::new();
        group.add_grab(target(1, &[]));
        group.add_grab(target(1, &[5]));
        assert_eq!(group.current_grab(), Some(target(1, &[5])));

        assert!(group.remove_grab(&target(1, &[5])));
        assert_eq!(group.current_grab(), Some(target(1, &[])));
        assert!(!group.remove_grab(&target(1, &[5])));
    }

    #[test]
    fn device_grabs_match_the_pair() {
        let group = WindowGroup::new();
        group.add_device_grab(target(1, &[5]), POINTER, false);

        assert_eq!(group.current_device_grab(KEYBOARD), Some(target(1, &[5])));
        assert_eq!(group.current_device_grab(TABLET), None);

        assert!(group.remove_device_grab(&target(1, &[5]), KEYBOARD));
        assert_eq!(group.current_device_grab(POINTER), None);
    }

    #[test]
    fn blocking_grabs_only_block_other_pairs() {
        let group = WindowGroup::new();
        group.add_device_grab(target(1, &[5]), TABLET, true);

        assert!(group.is_blocked_for_device(&target(1, &[5]), POINTER));
        assert!(group.is_blocked_for_device(&target(1, &[5, 6]), POINTER));
        assert!(!group.is_blocked_for_device(&target(1, &[8]), POINTER));
        assert!(!group.is_blocked_for_device(&target(1, &[5]), TABLET));
    }

    #[test]
    fn cleanup_drops_grabs_of_one_window() {
        let group = WindowGroup::new();
        group.add_grab(target(1, &[]));
        group.add_grab(target(2, &[]));
        group.add_device_grab(target(1, &[3]), POINTER, true);

        group.cleanup_grabs(WindowId(1));
        assert_eq!(group.current_grab(), Some(target(2, &[])));
        assert_eq!(group.current_device_grab(POINTER), None);
    }

    #[test]
    fn groups_compare_by_identity() {
        let group = WindowGroup::new();
        assert_eq!(group, group.clone());
        assert_ne!(group, WindowGroup::new());
    }
}
