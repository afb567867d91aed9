use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use dpi::{PhysicalPosition, PhysicalSize};
use toplevel_core::backend::NativeWindow;
use toplevel_core::state::{EventMask, ModifierType};
use toplevel_x11::{
    translate_event_mask, DeviceConnection, GrabStatus, RawPointer, X11Error, XI2Device,
    VIRTUAL_CORE_POINTER,
};
use x11rb::protocol::ErrorKind;
use x11rb::x11_utils::X11Error as LogicalError;

const ROOT: u32 = 0x100;
const TOPLEVEL: u32 = 0x20_0001;
const CHILD: u32 = 0x20_0002;
const FOREIGN: u32 = 0x40_0001;

#[derive(Debug)]
struct FakeWindow {
    parent: u32,
    /// Relative to the parent.
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    mapped: bool,
    ours: bool,
    /// Bottom to top.
    children: Vec<u32>,
}

/// A window tree with a pointer, answering queries the way an X server does.
#[derive(Debug)]
struct FakeServer {
    trusted: bool,
    pointer: (i32, i32),
    windows: RefCell<BTreeMap<u32, FakeWindow>>,
    failing: Vec<u32>,
    next_probe: Cell<u32>,
    server_grabs: Cell<i32>,
    destroyed: RefCell<Vec<u32>>,
    grab_status: GrabStatus,
    grabs: RefCell<Vec<(u16, u32, bool, Vec<u32>)>>,
    selected: RefCell<Vec<(u16, u32, Vec<u32>)>>,
    warps: RefCell<Vec<(f64, f64)>>,
}

impl FakeServer {
    fn new(trusted: bool, pointer: (i32, i32)) -> Self {
        let mut windows = BTreeMap::new();
        windows.insert(ROOT, FakeWindow {
            parent: 0,
            x: 0,
            y: 0,
            width: 1920,
            height: 1080,
            mapped: true,
            ours: false,
            children: Vec::new(),
        });

        FakeServer {
            trusted,
            pointer,
            windows: RefCell::new(windows),
            failing: Vec::new(),
            next_probe: Cell::new(0x20_1000),
            server_grabs: Cell::new(0),
            destroyed: RefCell::new(Vec::new()),
            grab_status: GrabStatus::Success,
            grabs: RefCell::new(Vec::new()),
            selected: RefCell::new(Vec::new()),
            warps: RefCell::new(Vec::new()),
        }
    }

    fn add(&self, id: u32, parent: u32, rect: (i32, i32, i32, i32), mapped: bool, ours: bool) {
        let mut windows = self.windows.borrow_mut();
        let (x, y, width, height) = rect;
        windows.insert(id, FakeWindow {
            parent,
            x,
            y,
            width,
            height,
            mapped,
            ours,
            children: Vec::new(),
        });
        windows.get_mut(&parent).unwrap().children.push(id);
    }

    fn with_toplevel(self) -> Self {
        self.add(TOPLEVEL, ROOT, (100, 100, 300, 200), true, true);
        self
    }

    fn is_probe(window: u32) -> bool {
        window >= 0x20_1000
    }
}

fn origin(windows: &BTreeMap<u32, FakeWindow>, mut window: u32) -> (i32, i32) {
    let (mut x, mut y) = (0, 0);
    while let Some(found) = windows.get(&window) {
        x += found.x;
        y += found.y;
        window = found.parent;
    }
    (x, y)
}

/// The deepest mapped window containing the point.
fn deepest_at(windows: &BTreeMap<u32, FakeWindow>, (px, py): (i32, i32)) -> u32 {
    let mut current = ROOT;
    'descend: loop {
        for &child in windows[&current].children.iter().rev() {
            let found = &windows[&child];
            let (x, y) = origin(windows, child);
            let inside = px >= x && py >= y && px < x + found.width && py < y + found.height;
            if found.mapped && inside {
                current = child;
                continue 'descend;
            }
        }
        return current;
    }
}

/// The child of `window` on the way down to `deepest`, or 0.
fn child_towards(windows: &BTreeMap<u32, FakeWindow>, window: u32, deepest: u32) -> u32 {
    let mut current = deepest;
    while current != ROOT && current != window {
        let parent = windows[&current].parent;
        if parent == window {
            return current;
        }
        current = parent;
    }
    0
}

fn bad_window(window: u32) -> X11Error {
    X11Error::X11(LogicalError {
        error_kind: ErrorKind::Window,
        error_code: 3,
        sequence: 0,
        bad_value: window,
        minor_opcode: 40,
        major_opcode: 131,
        extension_name: None,
        request_name: Some("XIQueryPointer"),
    })
}

impl DeviceConnection for FakeServer {
    fn root(&self) -> u32 {
        ROOT
    }

    fn is_trusted(&self) -> bool {
        self.trusted
    }

    fn xi_query_pointer(&self, _device: u16, window: u32) -> Result<RawPointer, X11Error> {
        let windows = self.windows.borrow();
        let allowed = match windows.get(&window) {
            Some(found) => self.trusted || found.ours,
            None => false,
        };
        if !allowed || self.failing.contains(&window) {
            return Err(bad_window(window));
        }

        let (x, y) = origin(&windows, window);
        let deepest = deepest_at(&windows, self.pointer);
        Ok(RawPointer {
            root: ROOT,
            child: child_towards(&windows, window, deepest),
            root_x: self.pointer.0.into(),
            root_y: self.pointer.1.into(),
            win_x: (self.pointer.0 - x).into(),
            win_y: (self.pointer.1 - y).into(),
            same_screen: true,
            mods: ModifierType::SHIFT.bits(),
            buttons: vec![1 << 1],
            group: 0,
        })
    }

    fn create_probe(&self, parent: u32, x: i16, y: i16) -> Result<u32, X11Error> {
        if !self.windows.borrow().contains_key(&parent) {
            return Err(bad_window(parent));
        }

        let probe = self.next_probe.get();
        self.next_probe.set(probe + 1);
        self.add(probe, parent, (x.into(), y.into(), 1, 1), false, true);
        Ok(probe)
    }

    fn map_window(&self, window: u32) -> Result<(), X11Error> {
        let mut windows = self.windows.borrow_mut();
        windows.get_mut(&window).ok_or_else(|| bad_window(window))?.mapped = true;
        Ok(())
    }

    fn destroy_window(&self, window: u32) -> Result<(), X11Error> {
        let mut windows = self.windows.borrow_mut();
        let removed = windows.remove(&window).ok_or_else(|| bad_window(window))?;
        if let Some(parent) = windows.get_mut(&removed.parent) {
            parent.children.retain(|&child| child != window);
        }
        self.destroyed.borrow_mut().push(window);
        Ok(())
    }

    fn window_size(&self, window: u32) -> Result<PhysicalSize<i32>, X11Error> {
        let windows = self.windows.borrow();
        let found = windows.get(&window).ok_or_else(|| bad_window(window))?;
        Ok(PhysicalSize::new(found.width, found.height))
    }

    fn grab_server(&self) -> Result<(), X11Error> {
        self.server_grabs.set(self.server_grabs.get() + 1);
        Ok(())
    }

    fn ungrab_server(&self) -> Result<(), X11Error> {
        self.server_grabs.set(self.server_grabs.get() - 1);
        Ok(())
    }

    fn xi_select_events(&self, device: u16, window: u32, mask: &[u32]) -> Result<(), X11Error> {
        self.selected.borrow_mut().push((device, window, mask.to_vec()));
        Ok(())
    }

    fn xi_grab_device(
        &self,
        device: u16,
        window: u32,
        _time: u32,
        owner_events: bool,
        mask: &[u32],
    ) -> Result<GrabStatus, X11Error> {
        self.grabs.borrow_mut().push((device, window, owner_events, mask.to_vec()));
        Ok(self.grab_status)
    }

    fn xi_ungrab_device(&self, _device: u16, _time: u32) -> Result<(), X11Error> {
        Ok(())
    }

    fn xi_warp_pointer(&self, _device: u16, x: f64, y: f64) -> Result<(), X11Error> {
        self.warps.borrow_mut().push((x, y));
        Ok(())
    }
}

fn known(windows: &[u32]) -> impl Fn(NativeWindow) -> bool + '_ {
    move |window| windows.contains(&window.raw())
}

#[test]
fn trusted_walk_finds_the_deepest_known_window() {
    let server = FakeServer::new(true, (120, 115)).with_toplevel();
    server.add(CHILD, TOPLEVEL, (10, 10, 50, 50), true, true);
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);

    let found = device
        .window_at_position(&[NativeWindow(TOPLEVEL)], known(&[TOPLEVEL, CHILD]), false)
        .unwrap();
    assert_eq!(found.window, Some(NativeWindow(CHILD)));
    assert_eq!(found.position, PhysicalPosition::new(10, 5));
    assert_eq!(found.mask, ModifierType::SHIFT | ModifierType::BUTTON1);
    assert_eq!(server.server_grabs.get(), 0);
}

#[test]
fn toplevel_walk_stops_at_the_first_known_window() {
    let server = FakeServer::new(true, (120, 115)).with_toplevel();
    server.add(CHILD, TOPLEVEL, (10, 10, 50, 50), true, true);
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);

    let found = device
        .window_at_position(&[NativeWindow(TOPLEVEL)], known(&[TOPLEVEL, CHILD]), true)
        .unwrap();
    assert_eq!(found.window, Some(NativeWindow(TOPLEVEL)));
    assert_eq!(found.position, PhysicalPosition::new(20, 15));
}

#[test]
fn foreign_windows_report_no_position() {
    let server = FakeServer::new(true, (120, 115)).with_toplevel();
    server.add(FOREIGN, ROOT, (0, 0, 500, 500), true, false);
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);

    let found = device.window_at_position(&[NativeWindow(TOPLEVEL)], known(&[TOPLEVEL]), false);
    let found = found.unwrap();
    assert_eq!(found.window, None);
    assert_eq!(found.position, PhysicalPosition::new(-1, -1));
}

#[test]
fn walk_stops_at_a_window_that_went_away() {
    let mut server = FakeServer::new(true, (120, 115)).with_toplevel();
    server.add(CHILD, TOPLEVEL, (10, 10, 50, 50), true, true);
    server.failing.push(CHILD);
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);

    let found = device
        .window_at_position(&[NativeWindow(TOPLEVEL)], known(&[TOPLEVEL, CHILD]), false)
        .unwrap();
    assert_eq!(found.window, Some(NativeWindow(CHILD)));
    assert_eq!(server.server_grabs.get(), 0);
}

#[test]
fn untrusted_walk_verifies_childless_toplevels_with_a_probe() {
    let server = FakeServer::new(false, (150, 120)).with_toplevel();
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);

    let found = device
        .window_at_position(&[NativeWindow(TOPLEVEL)], known(&[TOPLEVEL]), false)
        .unwrap();
    assert_eq!(found.window, Some(NativeWindow(TOPLEVEL)));
    assert_eq!(found.position, PhysicalPosition::new(50, 20));

    let destroyed = server.destroyed.borrow();
    assert_eq!(destroyed.len(), 1);
    assert!(FakeServer::is_probe(destroyed[0]));
    assert!(!server.windows.borrow().contains_key(&destroyed[0]));
}

#[test]
fn untrusted_walk_rejects_obscured_toplevels() {
    let server = FakeServer::new(false, (150, 120)).with_toplevel();
    server.add(FOREIGN, ROOT, (0, 0, 500, 500), true, false);
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);

    let found = device
        .window_at_position(&[NativeWindow(TOPLEVEL)], known(&[TOPLEVEL]), false)
        .unwrap();
    assert_eq!(found.window, None);
    assert_eq!(found.position, PhysicalPosition::new(-1, -1));
    assert_eq!(server.destroyed.borrow().len(), 1);
}

#[test]
fn untrusted_walk_skips_destroyed_toplevels_and_takes_children() {
    let server = FakeServer::new(false, (120, 115)).with_toplevel();
    server.add(CHILD, TOPLEVEL, (10, 10, 50, 50), true, true);
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);

    let toplevels = [NativeWindow(0x20_0099), NativeWindow(TOPLEVEL)];
    let found = device.window_at_position(&toplevels, known(&[TOPLEVEL, CHILD]), false).unwrap();
    assert_eq!(found.window, Some(NativeWindow(CHILD)));
    assert_eq!(found.position, PhysicalPosition::new(10, 5));
    // A reported child needs no probe.
    assert!(server.destroyed.borrow().is_empty());
}

#[test]
fn pointer_state_for_trusted_and_untrusted_clients() {
    let server = FakeServer::new(true, (150, 120)).with_toplevel();
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);
    let state = device.query_state(NativeWindow(TOPLEVEL)).unwrap().unwrap();
    assert_eq!(state.window, PhysicalPosition::new(50.0, 20.0));
    assert_eq!(state.root, PhysicalPosition::new(150.0, 120.0));
    assert_eq!(state.child, None);
    assert!(server.destroyed.borrow().is_empty());

    let server = FakeServer::new(false, (150, 120)).with_toplevel();
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);
    let state = device.query_state(NativeWindow(TOPLEVEL)).unwrap().unwrap();
    // Answered through a probe at the root origin.
    assert_eq!(state.window, PhysicalPosition::new(150.0, 120.0));
    assert_eq!(state.mask, ModifierType::SHIFT | ModifierType::BUTTON1);
    assert_eq!(server.destroyed.borrow().len(), 1);
}

#[test]
fn query_state_on_a_destroyed_window_is_no_answer() {
    let server = FakeServer::new(true, (150, 120));
    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);
    let err = device.query_state(NativeWindow(TOPLEVEL)).unwrap().unwrap_err();
    assert!(err.is_protocol());
}

#[test]
fn grabs_select_translated_masks() {
    let mut server = FakeServer::new(true, (0, 0)).with_toplevel();
    server.grab_status = GrabStatus::AlreadyGrabbed;
    let mask = EventMask::BUTTON_PRESS | EventMask::POINTER_MOTION;

    let device = XI2Device::new(&server, VIRTUAL_CORE_POINTER);
    let status = device.grab(NativeWindow(TOPLEVEL), true, mask, 0).unwrap();
    assert_eq!(status, GrabStatus::AlreadyGrabbed);
    assert_eq!(server.grabs.borrow()[0], (
        VIRTUAL_CORE_POINTER,
        TOPLEVEL,
        true,
        translate_event_mask(mask)
    ));

    device.select_window_events(NativeWindow(TOPLEVEL), EventMask::KEY_PRESS).unwrap();
    assert_eq!(server.selected.borrow()[0].2, translate_event_mask(EventMask::KEY_PRESS));

    device.warp(12.5, 40.0).unwrap();
    assert_eq!(server.warps.borrow()[0], (12.5, 40.0));
}

#[test]
fn nograbs_pretends_to_grab() {
    let server = FakeServer::new(true, (0, 0)).with_toplevel();
    let device = XI2Device::new(&server, 4).with_nograbs(true);

    let status = device.grab(NativeWindow(TOPLEVEL), false, EventMask::SCROLL, 0).unwrap();
    assert_eq!(status, GrabStatus::Success);
    assert!(server.grabs.borrow().is_empty());
    assert_eq!(device.device_id(), 4);
    device.ungrab(0).unwrap();
}
