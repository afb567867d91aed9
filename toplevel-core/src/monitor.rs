//! Types describing the monitor layout of a screen.
//!
//! A [`MonitorSet`] is an ordered snapshot: monitors are sorted leftmost and topmost first, and
//! cloned outputs sharing an origin are sorted taller first, then wider first. Snapshots are
//! rebuilt wholesale by a [`TopologyProbe`] and compared by value.
use std::cmp::Ordering;

use dpi::{PhysicalPosition, PhysicalSize};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::geometry::Rect;

/// A physical output showing part of the screen.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Monitor {
    /// Area of the screen covered by this monitor.
    pub geometry: Rect,
    /// Physical width, if the provider knows it.
    pub width_mm: Option<u32>,
    /// Physical height, if the provider knows it.
    pub height_mm: Option<u32>,
    /// Opaque provider identifier, e.g. the RandR output.
    pub output: u32,
    /// Connector name, such as `"DP-1"`.
    pub name: Option<SmolStr>,
    pub manufacturer: Option<SmolStr>,
}

impl Monitor {
    /// A monitor covering `geometry` with nothing else known about it.
    pub fn from_geometry(geometry: Rect) -> Self {
        Monitor { geometry, ..Default::default() }
    }

    #[inline]
    pub fn position(&self) -> PhysicalPosition<i32> {
        self.geometry.origin()
    }

    #[inline]
    pub fn size(&self) -> PhysicalSize<i32> {
        self.geometry.size()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

// Output ids are not compared: a re-plugged output may come back with a new id.
impl PartialEq for Monitor {
    fn eq(&self, other: &Self) -> bool {
        self.geometry == other.geometry
            && self.width_mm == other.width_mm
            && self.height_mm == other.height_mm
            && self.name == other.name
            && self.manufacturer == other.manufacturer
    }
}

impl Eq for Monitor {}

/// Ordering used for every monitor list: x ascending, y ascending, height descending, width
/// descending.
pub fn monitor_order(a: &Monitor, b: &Monitor) -> Ordering {
    a.geometry
        .x
        .cmp(&b.geometry.x)
        .then(a.geometry.y.cmp(&b.geometry.y))
        .then(b.geometry.height.cmp(&a.geometry.height))
        .then(b.geometry.width.cmp(&a.geometry.width))
}

/// An ordered monitor layout plus the index of the primary monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorSet {
    monitors: Vec<Monitor>,
    primary: usize,
}

impl MonitorSet {
    /// Sort `monitors` and make the first one primary.
    ///
    /// Returns `None` for an empty list; a screen always has at least one monitor.
    pub fn new(mut monitors: Vec<Monitor>) -> Option<Self> {
        if monitors.is_empty() {
            return None;
        }

        monitors.sort_by(monitor_order);
        Some(MonitorSet { monitors, primary: 0 })
    }

    /// Exactly one monitor spanning the whole screen.
    pub fn single(screen: Rect) -> Self {
        MonitorSet { monitors: vec![Monitor::from_geometry(screen)], primary: 0 }
    }

    /// Pick the primary monitor by index into the sorted list.
    ///
    /// Out of range indices fall back to 0.
    pub fn with_primary(mut self, primary: usize) -> Self {
        self.primary = if primary < self.monitors.len() { primary } else { 0 };
        self
    }

    /// Re-establish the canonical order. The primary monitor follows its entry.
    pub fn sort(&mut self) {
        let primary = self.monitors[self.primary].clone();
        self.monitors.sort_by(monitor_order);
        self.primary = self.monitors.iter().position(|m| *m == primary).unwrap_or(0);
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn primary_index(&self) -> usize {
        self.primary
    }

    pub fn primary(&self) -> &Monitor {
        &self.monitors[self.primary]
    }

    pub fn get(&self, index: usize) -> Option<&Monitor> {
        self.monitors.get(index)
    }

    /// The monitor containing the point, else the nearest one.
    ///
    /// Distance is the sum of the horizontal and vertical gaps to the monitor edges.
    pub fn monitor_at_point(&self, x: i32, y: i32) -> usize {
        let mut nearest_dist = i64::MAX;
        let mut nearest = 0;

        for (index, monitor) in self.monitors.iter().enumerate() {
            let geometry = &monitor.geometry;
            let (x, y) = (x as i64, y as i64);
            let (gx, gy) = (geometry.x as i64, geometry.y as i64);
            let (gw, gh) = (geometry.width as i64, geometry.height as i64);

            let dist_x = if x < gx {
                gx - x
            } else if gx + gw <= x {
                x - (gx + gw) + 1
            } else {
                0
            };

            let dist_y = if y < gy {
                gy - y
            } else if gy + gh <= y {
                y - (gy + gh) + 1
            } else {
                0
            };

            if dist_x == 0 && dist_y == 0 {
                return index;
            }

            if dist_x + dist_y < nearest_dist {
                nearest_dist = dist_x + dist_y;
                nearest = index;
            }
        }

        nearest
    }

    /// The monitor sharing the largest area with `rect`, else the one nearest its center.
    pub fn monitor_at_rect(&self, rect: &Rect) -> usize {
        let mut largest_overlap = 0;
        let mut matched = None;

        for (index, monitor) in self.monitors.iter().enumerate() {
            let overlapping_area = rect.overlapping_area(&monitor.geometry);
            if overlapping_area > largest_overlap {
                largest_overlap = overlapping_area;
                matched = Some(index);
            }
        }

        match matched {
            Some(index) => index,
            None => {
                let (x, y) = rect.center();
                self.monitor_at_point(x, y)
            },
        }
    }
}

/// One way of discovering the monitor layout.
///
/// Probes are tried in order until one answers; a probe that does not apply to the current
/// display returns `None` so the next one gets a chance.
pub trait TopologyProbe {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn try_discover(&self, screen: &Rect) -> Option<MonitorSet>;
}
