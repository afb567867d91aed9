//! The screen and its monitor layout.
//!
//! The layout is discovered by running an ordered chain of [`TopologyProbe`]s: the first probe
//! that answers wins, and a screen where no probe answers is treated as a single monitor. The
//! result is cached until the window system reports a change, at which point discovery runs
//! again and the fresh snapshot is compared by value with the cached one.

use std::cell::RefCell;
use std::mem;

use toplevel_core::backend::WindowSystem;
use toplevel_core::geometry::Rect;
use toplevel_core::monitor::{Monitor, MonitorSet, TopologyProbe};
use tracing::{debug, warn};

use crate::observer::Observers;

/// Splits the screen into four equal monitors, for testing multi-monitor code on one monitor.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeMultihead;

impl TopologyProbe for FakeMultihead {
    fn name(&self) -> &'static str {
        "fake multihead"
    }

    fn try_discover(&self, screen: &Rect) -> Option<MonitorSet> {
        let (width, height) = (screen.width / 2, screen.height / 2);
        let quarters = [(0, 0), (width, 0), (0, height), (width, height)];

        MonitorSet::new(
            quarters
                .iter()
                .map(|&(x, y)| Monitor::from_geometry(Rect::new(x, y, width, height)))
                .collect(),
        )
    }
}

/// Run the probe chain for a screen.
///
/// Never fails: without an answer from any probe the whole screen is one monitor.
pub fn discover<'a, I>(probes: I, screen: &Rect) -> MonitorSet
where
    I: IntoIterator<Item = &'a dyn TopologyProbe>,
{
    for probe in probes {
        if let Some(mut monitors) = probe.try_discover(screen) {
            monitors.sort();
            debug!(probe = probe.name(), n_monitors = monitors.len(), "discovered monitors");
            return monitors;
        }
    }

    MonitorSet::single(*screen)
}

/// A discovered monitor layout, not yet applied to a [`Screen`].
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub monitors: MonitorSet,
    pub work_area: Option<Rect>,
}

#[derive(Debug)]
struct ScreenState {
    rect: Rect,
    work_area: Option<Rect>,
    monitors: MonitorSet,
}

/// A screen, its work area and its monitors.
#[derive(Debug)]
pub struct Screen {
    state: RefCell<ScreenState>,
    fake_multihead: bool,
    monitors_changed: Observers<MonitorSet>,
    size_changed: Observers<Rect>,
}

impl Screen {
    /// Query the screen from `backend` and discover its monitors.
    pub fn new(backend: &dyn WindowSystem, fake_multihead: bool) -> Self {
        let rect = backend.screen_rect();
        let monitors = Self::discover_with(backend, &rect, fake_multihead);
        Screen {
            state: RefCell::new(ScreenState { rect, work_area: backend.work_area(), monitors }),
            fake_multihead,
            monitors_changed: Observers::new(),
            size_changed: Observers::new(),
        }
    }

    /// A screen with a known layout, not tied to any window system.
    pub fn with_monitors(rect: Rect, monitors: MonitorSet) -> Self {
        Screen {
            state: RefCell::new(ScreenState { rect, work_area: None, monitors }),
            fake_multihead: false,
            monitors_changed: Observers::new(),
            size_changed: Observers::new(),
        }
    }

    fn discover_with(backend: &dyn WindowSystem, rect: &Rect, fake_multihead: bool) -> MonitorSet {
        let probes = backend.topology_probes();

        let mut chain: Vec<&dyn TopologyProbe> = Vec::with_capacity(probes.len() + 1);
        if fake_multihead {
            chain.push(&FakeMultihead);
        }
        for probe in &probes {
            chain.push(probe.as_ref());
        }

        discover(chain, rect)
    }

    pub fn rect(&self) -> Rect {
        self.state.borrow().rect
    }

    pub fn work_area(&self) -> Option<Rect> {
        self.state.borrow().work_area
    }

    pub fn set_work_area(&self, work_area: Option<Rect>) {
        self.state.borrow_mut().work_area = work_area;
    }

    /// A snapshot of the current layout.
    pub fn monitors(&self) -> MonitorSet {
        self.state.borrow().monitors.clone()
    }

    pub fn n_monitors(&self) -> usize {
        self.state.borrow().monitors.len()
    }

    pub fn primary_monitor(&self) -> usize {
        self.state.borrow().monitors.primary_index()
    }

    /// Geometry of monitor `index`, the whole screen if there is no such monitor.
    pub fn monitor_geometry(&self, index: usize) -> Rect {
        let state = self.state.borrow();
        match state.monitors.get(index) {
            Some(monitor) => monitor.geometry,
            None => {
                debug_assert!(false, "monitor {index} out of range");
                warn!("monitor {} out of range, using the whole screen", index);
                state.rect
            },
        }
    }

    /// The part of monitor `index` not reserved by panels and docks.
    ///
    /// Falls back to the monitor geometry when the work area is unknown or does not overlap
    /// the monitor.
    pub fn monitor_workarea(&self, index: usize) -> Rect {
        let geometry = self.monitor_geometry(index);
        self.work_area().and_then(|area| area.intersection(&geometry)).unwrap_or(geometry)
    }

    pub fn monitor_at_point(&self, x: i32, y: i32) -> usize {
        self.state.borrow().monitors.monitor_at_point(x, y)
    }

    pub fn monitor_at_rect(&self, rect: &Rect) -> usize {
        self.state.borrow().monitors.monitor_at_rect(rect)
    }

    /// Replace the layout, notifying observers if it differs from the current one.
    ///
    /// Returns whether anything changed.
    pub fn update_monitors(&self, monitors: MonitorSet) -> bool {
        let changed = {
            let mut state = self.state.borrow_mut();
            if state.monitors == monitors {
                false
            } else {
                state.monitors = monitors.clone();
                true
            }
        };

        if changed {
            debug!(n_monitors = monitors.len(), "monitors changed");
            self.monitors_changed.emit(&monitors);
        }

        changed
    }

    /// Run discovery against the current screen rectangle without applying the result.
    pub fn discover(&self, backend: &dyn WindowSystem) -> Discovery {
        Discovery {
            monitors: Self::discover_with(backend, &self.rect(), self.fake_multihead),
            work_area: backend.work_area(),
        }
    }

    /// Store a discovery result, notifying observers if the monitors changed.
    pub fn apply(&self, discovery: Discovery) -> bool {
        self.set_work_area(discovery.work_area);
        self.update_monitors(discovery.monitors)
    }

    /// Rediscover the monitors after the window system reported a change.
    pub fn refresh(&self, backend: &dyn WindowSystem) -> bool {
        self.apply(self.discover(backend))
    }

    /// Store a new root window rectangle. Returns whether the size changed.
    pub(crate) fn set_rect(&self, rect: Rect) -> bool {
        let old = mem::replace(&mut self.state.borrow_mut().rect, rect);
        old.width != rect.width || old.height != rect.height
    }

    pub(crate) fn notify_size_changed(&self) {
        let rect = self.rect();
        self.size_changed.emit(&rect);
    }

    /// Handle a resize of the root window.
    ///
    /// Rediscovers the monitors and notifies size observers if the size changed.
    pub fn set_size(&self, backend: &dyn WindowSystem, rect: Rect) {
        let resized = self.set_rect(rect);
        self.refresh(backend);
        if resized {
            self.notify_size_changed();
        }
    }

    /// Call `handler` with the new layout whenever the monitors change.
    pub fn on_monitors_changed(&self, handler: impl FnMut(&MonitorSet) + 'static) {
        self.monitors_changed.add(handler);
    }

    /// Call `handler` with the new screen rectangle whenever the screen is resized.
    pub fn on_size_changed(&self, handler: impl FnMut(&Rect) + 'static) {
        self.size_changed.add(handler);
    }

    pub(crate) fn clear_observers(&self) {
        self.monitors_changed.clear();
        self.size_changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    struct Never;

    impl TopologyProbe for Never {
        fn name(&self) -> &'static str {
            "never"
        }

        fn try_discover(&self, _screen: &Rect) -> Option<MonitorSet> {
            None
        }
    }

    struct Fixed(Vec<Rect>);

    impl TopologyProbe for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn try_discover(&self, _screen: &Rect) -> Option<MonitorSet> {
            MonitorSet::new(self.0.iter().copied().map(Monitor::from_geometry).collect())
        }
    }

    #[test]
    fn fake_multihead_quarters_the_screen() {
        let set = FakeMultihead.try_discover(&Rect::from_size(1920, 1080)).unwrap();
        let rects: Vec<_> = set.monitors().iter().map(|m| m.geometry).collect();
        assert_eq!(rects, vec![
            Rect::new(0, 0, 960, 540),
            Rect::new(0, 540, 960, 540),
            Rect::new(960, 0, 960, 540),
            Rect::new(960, 540, 960, 540),
        ]);
    }

    #[test]
    fn first_answering_probe_wins() {
        let screen = Rect::from_size(3000, 1000);
        let fixed = Fixed(vec![Rect::new(1000, 0, 2000, 1000), Rect::new(0, 0, 1000, 800)]);
        let probes: [&dyn TopologyProbe; 3] = [&Never, &fixed, &FakeMultihead];

        let set = discover(probes, &screen);
        assert_eq!(set.len(), 2);
        assert_eq!(set.monitors()[0].geometry, Rect::new(0, 0, 1000, 800));
    }

    #[test]
    fn no_answer_means_one_monitor() {
        let screen = Rect::from_size(800, 600);
        let probes: [&dyn TopologyProbe; 1] = [&Never];
        assert_eq!(discover(probes, &screen), MonitorSet::single(screen));
    }

    #[test]
    fn workarea_is_clipped_to_the_monitor() {
        let monitors = MonitorSet::new(vec![
            Monitor::from_geometry(Rect::new(0, 0, 1920, 1080)),
            Monitor::from_geometry(Rect::new(1920, 0, 1920, 1080)),
        ])
        .unwrap();
        let screen = Screen::with_monitors(Rect::from_size(3840, 1080), monitors);
        assert_eq!(screen.monitor_workarea(1), Rect::new(1920, 0, 1920, 1080));

        screen.set_work_area(Some(Rect::new(0, 32, 3840, 1048)));
        assert_eq!(screen.monitor_workarea(0), Rect::new(0, 32, 1920, 1048));
        assert_eq!(screen.monitor_workarea(1), Rect::new(1920, 32, 1920, 1048));
    }

    #[test]
    fn identical_snapshot_is_not_a_change() {
        let screen = Screen::with_monitors(
            Rect::from_size(1920, 1080),
            MonitorSet::single(Rect::from_size(1920, 1080)),
        );
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        screen.on_monitors_changed(move |_| counter.set(counter.get() + 1));

        assert!(!screen.update_monitors(MonitorSet::single(Rect::from_size(1920, 1080))));
        assert_eq!(fired.get(), 0);

        let mut monitor = Monitor::from_geometry(Rect::from_size(1920, 1080));
        monitor.width_mm = Some(520);
        assert!(screen.update_monitors(MonitorSet::new(vec![monitor]).unwrap()));
        assert_eq!(fired.get(), 1);
    }
}
