//! Atom management.

use x11rb::atom_manager;

atom_manager! {
    /// The atoms interned when connecting.
    pub(crate) Atoms: AtomsCookie {
        // ICCCM.
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
        WM_CHANGE_STATE,
        UTF8_STRING,

        // EWMH window state.
        _NET_WM_NAME,
        _NET_WM_STATE,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_BELOW,
        _NET_WM_STATE_FOCUSED,
        _NET_WM_STATE_FULLSCREEN,
        _NET_WM_STATE_HIDDEN,
        _NET_WM_STATE_MAXIMIZED_HORZ,
        _NET_WM_STATE_MAXIMIZED_VERT,
        _NET_WM_STATE_STICKY,

        // EWMH root and frame properties.
        _NET_ACTIVE_WINDOW,
        _NET_FRAME_EXTENTS,
        _NET_WORKAREA,

        // Configure acknowledgement.
        _NET_WM_SYNC_REQUEST,
        _NET_WM_SYNC_REQUEST_COUNTER,

        // Startup notification.
        _NET_STARTUP_INFO_BEGIN,
        _NET_STARTUP_INFO,
    }
}
