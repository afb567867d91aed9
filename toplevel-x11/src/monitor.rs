//! Monitor discovery through RandR 1.3 and Xinerama.

use smol_str::SmolStr;
use toplevel_core::geometry::Rect;
use toplevel_core::monitor::{Monitor, MonitorSet, TopologyProbe};
use tracing::debug;
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xinerama::{self, ConnectionExt as _};

use crate::error::X11Error;
use crate::xdisplay::XConnection;

/// Output name reported by drivers without RandR 1.2 support.
const RANDR10_OUTPUT: &str = "default";

/// What RandR reports about one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub output: u32,
    pub name: SmolStr,
    pub connected: bool,
    /// Geometry of the CRTC driving the output, `None` when the output is off.
    pub crtc: Option<Rect>,
    pub width_mm: u32,
    pub height_mm: u32,
}

/// Turn RandR outputs, in server order, into a monitor set.
///
/// Returns `None` when the driver has no usable multihead data: an output is named `default`,
/// or no output is lit.
pub fn randr_monitor_set(
    outputs: &[OutputInfo],
    primary_output: Option<u32>,
) -> Option<MonitorSet> {
    if outputs.iter().any(|output| output.name == RANDR10_OUTPUT) {
        debug!("RandR outputs come from a pre-1.2 driver");
        return None;
    }

    let monitors = outputs
        .iter()
        .filter(|output| output.connected)
        .filter_map(|output| {
            Some(Monitor {
                geometry: output.crtc?,
                width_mm: Some(output.width_mm),
                height_mm: Some(output.height_mm),
                output: output.output,
                name: Some(output.name.clone()),
                manufacturer: None,
            })
        })
        .collect();

    let set = MonitorSet::new(monitors)?;
    let first_output = outputs.first().map(|output| output.output);
    let primary = select_primary(set.monitors(), primary_output, first_output);
    Some(set.with_primary(primary))
}

/// Pick the primary monitor out of a sorted list.
///
/// The server's primary output wins. Without one, a laptop panel (`LVDS*`) is preferred, then
/// the first output the server enumerated.
pub fn select_primary(
    monitors: &[Monitor],
    primary_output: Option<u32>,
    first_output: Option<u32>,
) -> usize {
    let mut primary = 0;

    for (index, monitor) in monitors.iter().enumerate() {
        if Some(monitor.output) == primary_output {
            return index;
        }

        if primary_output.is_none() && is_lvds(monitor.name()) {
            return index;
        }

        if Some(monitor.output) == first_output {
            primary = index;
        }
    }

    primary
}

fn is_lvds(name: Option<&str>) -> bool {
    name.and_then(|name| name.get(..4)).is_some_and(|prefix| prefix.eq_ignore_ascii_case("LVDS"))
}

/// Discovers monitors through RandR 1.3 `GetScreenResourcesCurrent`.
#[derive(Debug)]
pub struct RandR13Probe<'a> {
    xconn: &'a XConnection,
}

impl<'a> RandR13Probe<'a> {
    pub fn new(xconn: &'a XConnection) -> Self {
        RandR13Probe { xconn }
    }

    fn query(&self) -> Result<Option<MonitorSet>, X11Error> {
        if !self.xconn.has_randr13() {
            return Ok(None);
        }

        let conn = self.xconn.xcb_connection();
        let root = self.xconn.root();
        let resources = conn.randr_get_screen_resources_current(root)?.reply()?;
        let timestamp = resources.config_timestamp;

        // Pipeline all of the get-output requests.
        let mut output_cookies = Vec::with_capacity(resources.outputs.len());
        for &output in &resources.outputs {
            output_cookies.push(conn.randr_get_output_info(output, timestamp)?);
        }

        let primary = conn.randr_get_output_primary(root)?.reply()?.output;

        let mut outputs = Vec::with_capacity(output_cookies.len());
        for (&output, cookie) in resources.outputs.iter().zip(output_cookies) {
            let info = cookie.reply()?;
            let connected = info.connection != randr::Connection::DISCONNECTED;
            let crtc = if connected && info.crtc != 0 {
                let crtc = conn.randr_get_crtc_info(info.crtc, timestamp)?.reply()?;
                let (width, height) = (crtc.width.into(), crtc.height.into());
                Some(Rect::new(crtc.x.into(), crtc.y.into(), width, height))
            } else {
                None
            };

            outputs.push(OutputInfo {
                output,
                name: SmolStr::new(String::from_utf8_lossy(&info.name)),
                connected,
                crtc,
                width_mm: info.mm_width,
                height_mm: info.mm_height,
            });
        }

        Ok(randr_monitor_set(&outputs, (primary != 0).then_some(primary)))
    }
}

impl TopologyProbe for RandR13Probe<'_> {
    fn name(&self) -> &'static str {
        "randr13"
    }

    fn try_discover(&self, _screen: &Rect) -> Option<MonitorSet> {
        self.query().unwrap_or_else(|err| {
            debug!("RandR monitor query failed: {err}");
            None
        })
    }
}

/// Turn Xinerama screens into a monitor set. The first screen is primary.
pub fn xinerama_monitor_set(screens: &[xinerama::ScreenInfo]) -> Option<MonitorSet> {
    let monitors = screens
        .iter()
        .map(|screen| {
            Monitor::from_geometry(Rect::new(
                screen.x_org.into(),
                screen.y_org.into(),
                screen.width.into(),
                screen.height.into(),
            ))
        })
        .collect();
    MonitorSet::new(monitors)
}

/// Discovers monitors through an active Xinerama.
#[derive(Debug)]
pub struct XineramaProbe<'a> {
    xconn: &'a XConnection,
}

impl<'a> XineramaProbe<'a> {
    pub fn new(xconn: &'a XConnection) -> Self {
        XineramaProbe { xconn }
    }

    fn query(&self) -> Result<Option<MonitorSet>, X11Error> {
        if !self.xconn.has_xinerama() {
            return Ok(None);
        }

        let conn = self.xconn.xcb_connection();
        if conn.xinerama_is_active()?.reply()?.state == 0 {
            return Ok(None);
        }

        // No screens happens while RandR switches CRTCs; a later notify brings them back.
        let screens = conn.xinerama_query_screens()?.reply()?.screen_info;
        Ok(xinerama_monitor_set(&screens))
    }
}

impl TopologyProbe for XineramaProbe<'_> {
    fn name(&self) -> &'static str {
        "xinerama"
    }

    fn try_discover(&self, _screen: &Rect) -> Option<MonitorSet> {
        self.query().unwrap_or_else(|err| {
            debug!("Xinerama monitor query failed: {err}");
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(output: u32, name: &str, crtc: Option<Rect>) -> OutputInfo {
        OutputInfo {
            output,
            name: SmolStr::new(name),
            connected: true,
            crtc,
            width_mm: 300,
            height_mm: 200,
        }
    }

    #[test]
    fn dark_and_disconnected_outputs_are_skipped() {
        let mut unplugged = output(0x43, "HDMI-1", Some(Rect::new(0, 0, 800, 600)));
        unplugged.connected = false;
        let outputs = [
            output(0x41, "DP-1", Some(Rect::new(1920, 0, 1280, 1024))),
            output(0x42, "DP-2", None),
            unplugged,
            output(0x44, "eDP-1", Some(Rect::new(0, 0, 1920, 1080))),
        ];

        let set = randr_monitor_set(&outputs, None).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.monitors()[0].name(), Some("eDP-1"));
        assert_eq!(set.monitors()[0].width_mm, Some(300));
        // First enumerated output.
        assert_eq!(set.primary_index(), 1);
    }

    #[test]
    fn pre_randr12_drivers_are_rejected() {
        let mut dark = output(0x42, "default", None);
        dark.connected = false;
        let outputs = [output(0x41, "VGA-0", Some(Rect::new(0, 0, 1024, 768))), dark];
        assert_eq!(randr_monitor_set(&outputs, None), None);
    }

    #[test]
    fn no_lit_outputs_is_no_answer() {
        assert_eq!(randr_monitor_set(&[output(0x41, "DP-1", None)], None), None);
        assert_eq!(randr_monitor_set(&[], Some(0x41)), None);
    }

    #[test]
    fn server_primary_wins() {
        let outputs = [
            output(0x41, "LVDS-1", Some(Rect::new(0, 0, 1366, 768))),
            output(0x42, "DP-1", Some(Rect::new(1366, 0, 1920, 1080))),
        ];
        assert_eq!(randr_monitor_set(&outputs, Some(0x42)).unwrap().primary_index(), 1);
    }

    #[test]
    fn lvds_is_preferred_without_a_server_primary() {
        let outputs = [
            output(0x41, "DP-1", Some(Rect::new(0, 0, 1920, 1080))),
            output(0x42, "lvds1", Some(Rect::new(1920, 0, 1366, 768))),
        ];
        assert_eq!(randr_monitor_set(&outputs, None).unwrap().primary_index(), 1);

        // A set primary that matches no lit output disables the panel preference.
        assert_eq!(randr_monitor_set(&outputs, Some(0x99)).unwrap().primary_index(), 0);
    }

    #[test]
    fn primary_selection_defaults_to_zero() {
        let monitors = [Monitor::from_geometry(Rect::from_size(640, 480))];
        assert_eq!(select_primary(&monitors, None, None), 0);
        assert_eq!(select_primary(&[], Some(1), Some(1)), 0);
        assert!(!is_lvds(Some("LVD")));
        assert!(!is_lvds(None));
    }

    #[test]
    fn xinerama_screens_are_sorted() {
        let screens = [
            xinerama::ScreenInfo { x_org: 1024, y_org: 0, width: 1024, height: 768 },
            xinerama::ScreenInfo { x_org: 0, y_org: 0, width: 1024, height: 768 },
        ];
        let set = xinerama_monitor_set(&screens).unwrap();
        assert_eq!(set.monitors()[0].geometry, Rect::new(0, 0, 1024, 768));
        assert_eq!(set.primary_index(), 0);
        assert_eq!(set.monitors()[1].width_mm, None);
        assert_eq!(xinerama_monitor_set(&[]), None);
    }
}
