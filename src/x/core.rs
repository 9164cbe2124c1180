//! The core interface between the window manager and the X server.
//!
//! The centerpiece of this module is the [`XConn`] trait, which
//! enumerates every operation the window manager needs from a display
//! connection. The manager is generic over it, so the entire state
//! machine can be driven by a mock connection in tests.

use thiserror::Error;

use crate::bindings::{Keybind, Mousebind};
use crate::core::types::{ClientAttrs, ClientConfig, Geometry};
use crate::x::cursor::CursorKind;
use crate::x::event::{ClientMessageEvent, ConfigureRequestData, XEvent};
use crate::x::input::{keysym::KeySym, KeyCode};
use crate::x::property::{Property, WindowState, WmHints, WmSizeHints};

/// An X server ID for a window.
pub type XWindowID = u32;

/// An X server ID for an interned atom.
pub type XAtom = u32;

/// A window as the X server sees it: an ID plus its last known geometry.
#[derive(Debug, Clone, Copy)]
pub struct XWindow {
    pub id: XWindowID,
    pub geom: Geometry,
}

impl PartialEq for XWindow {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl From<XWindowID> for XWindow {
    fn from(from: XWindowID) -> Self {
        Self {
            id: from,
            geom: Geometry::zeroed(),
        }
    }
}

impl XWindow {
    /// Creates an XWindow with the given ID and geometry.
    pub fn with_data(id: XWindowID, geom: Geometry) -> Self {
        Self { id, geom }
    }

    /// Creates an XWindow with no ID and zeroed geometry.
    pub fn zeroed() -> Self {
        Self {
            id: 0,
            geom: Geometry::zeroed(),
        }
    }

    /// Sets the geometry from a provided Geometry.
    pub fn set_geometry(&mut self, geom: Geometry) {
        self.geom = geom;
    }
}

/// The raw stacking mode carried by a configure request, forwarded
/// verbatim for unmanaged windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackModeRaw {
    Above,
    Below,
    TopIf,
    BottomIf,
    Opposite,
}

/// The class of window to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowClass {
    /// An invisible window used for checks and queries.
    CheckOnly,
    /// A window that can display content, e.g. a status bar. The color
    /// is the initial background.
    InputOutput(crate::core::types::Color),
}

/// The map state of a window, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    Unmapped,
    Unviewable,
    Viewable,
}

/// A subset of a window's attributes, as reported by the server.
#[derive(Debug, Clone, Copy)]
pub struct WindowAttributes {
    pub border_width: u32,
    pub override_redirect: bool,
    pub map_state: MapState,
}

/// A reply to a pointer query.
#[derive(Debug, Clone, Copy)]
pub struct PointerQueryReply {
    /// The root window the pointer is on.
    pub root: XWindowID,
    /// The child window containing the pointer, if any.
    pub child: Option<XWindowID>,
    /// Pointer x coordinate, relative to the root.
    pub root_x: i32,
    /// Pointer y coordinate, relative to the root.
    pub root_y: i32,
}

/// Protocol request opcodes appearing in the benign-error whitelist.
pub(crate) mod opcode {
    pub const CONFIGURE_WINDOW: u8 = 12;
    pub const GRAB_BUTTON: u8 = 28;
    pub const GRAB_KEY: u8 = 33;
    pub const SET_INPUT_FOCUS: u8 = 42;
    pub const COPY_AREA: u8 = 62;
    pub const POLY_SEGMENT: u8 = 66;
    pub const POLY_FILL_RECTANGLE: u8 = 70;
    pub const POLY_TEXT8: u8 = 74;
}

/// The kind of a protocol error returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// BadAccess.
    Access,
    /// BadDrawable.
    Drawable,
    /// BadMatch.
    Match,
    /// BadWindow.
    Window,
    /// Any other protocol error code.
    Other(u8),
}

/// A protocol error returned by the server, with the request that
/// provoked it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerError {
    pub kind: ServerErrorKind,
    pub major_opcode: u8,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "error {:?} from request with opcode {}",
            self.kind, self.major_opcode
        )
    }
}

/// Everything that could go wrong when talking to the X server.
#[non_exhaustive]
#[derive(Debug, Error, Clone)]
pub enum XError {
    /// An error establishing or maintaining the connection.
    #[error("X connection error: {0}")]
    Connection(String),

    /// No usable screens were found on the connection.
    #[error("Could not find screens from X server")]
    NoScreens,

    /// Some error caused by a RandR request.
    #[error("RandR error: {0}")]
    Randr(String),

    /// A protocol error returned by the server.
    #[error("X server error: {0}")]
    ServerError(ServerError),

    /// An error converting property or client message data.
    #[error("Error converting client message data")]
    ConversionError,

    /// A request for window properties returned malformed data.
    #[error("Invalid property data: {0}")]
    InvalidPropertyData(String),

    /// The request could not be fulfilled by the X server.
    #[error("Could not complete specified request: {0}")]
    RequestError(&'static str),

    /// Some other error.
    #[error("{0}")]
    OtherError(String),
}

impl XError {
    /// Whether this error belongs to the whitelist of benign protocol
    /// errors that routinely arise from clients vanishing mid-request,
    /// and can be silently dropped.
    pub fn is_ignorable(&self) -> bool {
        use opcode::*;
        use ServerErrorKind::*;

        let XError::ServerError(err) = self else {
            return false;
        };

        match (err.kind, err.major_opcode) {
            (Window, _) => true,
            (Match, SET_INPUT_FOCUS) | (Match, CONFIGURE_WINDOW) => true,
            (Drawable, POLY_TEXT8)
            | (Drawable, POLY_FILL_RECTANGLE)
            | (Drawable, POLY_SEGMENT)
            | (Drawable, COPY_AREA) => true,
            (Access, GRAB_BUTTON) | (Access, GRAB_KEY) => true,
            _ => false,
        }
    }
}

/// A specialized Result for X connection operations.
pub type Result<T> = ::core::result::Result<T, XError>;

/// A connection to an X server, providing every operation the window
/// manager needs.
///
/// The trait is split into rough sections: the event source, general
/// queries, input grabs, window operations, property access, ICCCM and
/// EWMH conveniences, and extension-backed extras.
///
/// Implementors are expected to have interned all [known atoms][1] by
/// the time the manager sees them.
///
/// [1]: crate::x::atom::Atom
pub trait XConn {
    //* Event source
    /// Blocks until the next event is available, flushing any pending
    /// requests first. Returns `None` when the connection shuts down.
    fn poll_next_event(&self) -> Result<Option<XEvent>>;
    /// Flushes pending requests and waits until the server has
    /// processed them.
    fn sync(&self) -> Result<()>;
    /// Discards any queued pointer-crossing events.
    ///
    /// Called after restacks and drags, which generate crossings that
    /// do not correspond to user pointer motion.
    fn drop_pending_crossings(&self);

    //* General queries
    fn get_root(&self) -> XWindow;
    /// The total dimensions of the X screen, spanning all monitors.
    fn screen_size(&self) -> (i32, i32);
    fn get_geometry(&self, window: XWindowID) -> Result<Geometry>;
    fn get_window_attributes(&self, window: XWindowID) -> Result<WindowAttributes>;
    fn query_tree(&self, window: XWindowID) -> Result<Vec<XWindowID>>;
    fn query_pointer(&self, window: XWindowID) -> Result<PointerQueryReply>;
    /// The geometry of every connected output, in no particular order.
    /// May contain duplicates; the caller deduplicates.
    fn all_outputs(&self) -> Result<Vec<Geometry>>;

    //* Atoms
    /// Looks up an atom's server ID, interning it if unknown.
    fn atom(&self, name: &str) -> Result<XAtom>;
    /// Looks up the name of an atom by its server ID.
    fn lookup_atom(&self, atom: XAtom) -> Result<String>;
    /// Looks up an already-interned atom without a server round trip.
    fn lookup_interned_atom(&self, name: &str) -> Option<XAtom>;

    //* Input grabs
    fn grab_key(&self, kb: Keybind, window: XWindowID) -> Result<()>;
    fn ungrab_keys(&self, window: XWindowID) -> Result<()>;
    fn grab_button(&self, mb: Mousebind, window: XWindowID, confine: bool) -> Result<()>;
    /// Grabs every button on the window, used for unfocused clients so
    /// the first click can be intercepted to focus them.
    fn grab_all_buttons(&self, window: XWindowID) -> Result<()>;
    fn ungrab_buttons(&self, window: XWindowID) -> Result<()>;
    fn grab_pointer(&self, window: XWindowID, cursor: CursorKind) -> Result<()>;
    fn ungrab_pointer(&self) -> Result<()>;
    /// Grabs the server, blocking all other clients' requests until
    /// [`ungrab_server`](XConn::ungrab_server). Used to close races
    /// against clients being destroyed mid-sequence.
    fn grab_server(&self) -> Result<()>;
    fn ungrab_server(&self) -> Result<()>;

    //* Window operations
    fn create_window(&self, class: WindowClass, geom: Geometry, managed: bool)
        -> Result<XWindowID>;
    fn destroy_window(&self, window: XWindowID) -> Result<()>;
    fn map_window(&self, window: XWindowID) -> Result<()>;
    fn unmap_window(&self, window: XWindowID) -> Result<()>;
    fn configure_window(&self, window: XWindowID, attrs: &[ClientConfig]) -> Result<()>;
    fn change_window_attributes(&self, window: XWindowID, attrs: &[ClientAttrs]) -> Result<()>;
    fn set_input_focus(&self, window: XWindowID) -> Result<()>;
    fn send_client_message(&self, window: XWindowID, msg: ClientMessageEvent) -> Result<()>;
    /// Sends a synthetic ConfigureNotify telling the window its current
    /// geometry, per ICCCM 4.1.5 for moves that the server will not
    /// announce itself.
    fn send_configure_notify(
        &self,
        window: XWindowID,
        geom: Geometry,
        border_width: u32,
    ) -> Result<()>;
    /// Forwards a configure request untouched, for unmanaged windows.
    fn forward_configure_request(&self, data: &ConfigureRequestData) -> Result<()>;
    /// Warps the pointer to `(x, y)`, relative to `window` or to the
    /// root if `None`.
    fn warp_pointer(&self, window: Option<XWindowID>, x: i32, y: i32) -> Result<()>;
    /// Forcibly disconnects the client owning the window.
    fn kill_client(&self, window: XWindowID) -> Result<()>;

    //* Properties
    fn get_property(&self, prop: &str, window: XWindowID) -> Result<Option<Property>>;
    fn set_property(&self, window: XWindowID, prop: &str, data: Property) -> Result<()>;
    fn append_property(&self, window: XWindowID, prop: &str, data: Property) -> Result<()>;
    fn delete_property(&self, window: XWindowID, prop: &str) -> Result<()>;

    //* ICCCM conveniences
    /// The window title, preferring `_NET_WM_NAME` over `WM_NAME`.
    fn get_wm_name(&self, window: XWindowID) -> String;
    /// The window's (instance, class) pair from `WM_CLASS`.
    fn get_wm_class(&self, window: XWindowID) -> (String, String);
    fn get_wm_size_hints(&self, window: XWindowID) -> Option<WmSizeHints>;
    fn get_wm_hints(&self, window: XWindowID) -> Option<WmHints>;
    fn get_wm_protocols(&self, window: XWindowID) -> Option<Vec<XAtom>>;
    fn get_wm_state(&self, window: XWindowID) -> Option<WindowState>;
    fn get_wm_transient_for(&self, window: XWindowID) -> Option<XWindowID>;
    fn set_wm_state(&self, window: XWindowID, state: WindowState);
    /// Clears the urgency bit in the window's WM_HINTS.
    fn clear_urgency(&self, window: XWindowID);

    //* EWMH conveniences
    fn get_window_type(&self, window: XWindowID) -> Option<Vec<XAtom>>;
    fn get_window_states(&self, window: XWindowID) -> Option<Vec<XAtom>>;

    //* Input plumbing
    /// The keysym in the first column of the given keycode's mapping.
    fn lookup_keysym(&self, code: KeyCode) -> KeySym;
    /// Re-fetches the keyboard mapping after a MappingNotify.
    fn refresh_keymap(&self) -> Result<()>;

    //* Extensions
    /// Erects pointer barriers around the given rectangles. A no-op if
    /// the XFixes extension is unavailable.
    fn create_pointer_barriers(&self, rects: &[Geometry]) -> Result<()>;
    /// Tears down all pointer barriers created by this connection.
    fn destroy_pointer_barriers(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_err(kind: ServerErrorKind, major_opcode: u8) -> XError {
        XError::ServerError(ServerError { kind, major_opcode })
    }

    #[test]
    fn whitelist_matches_known_benign_errors() {
        use ServerErrorKind::*;

        assert!(server_err(Window, 0).is_ignorable());
        assert!(server_err(Window, opcode::CONFIGURE_WINDOW).is_ignorable());
        assert!(server_err(Match, opcode::SET_INPUT_FOCUS).is_ignorable());
        assert!(server_err(Access, opcode::GRAB_KEY).is_ignorable());
        assert!(server_err(Drawable, opcode::COPY_AREA).is_ignorable());
    }

    #[test]
    fn whitelist_rejects_everything_else() {
        use ServerErrorKind::*;

        assert!(!server_err(Match, opcode::GRAB_KEY).is_ignorable());
        assert!(!server_err(Access, opcode::SET_INPUT_FOCUS).is_ignorable());
        assert!(!server_err(Other(8), 0).is_ignorable());
        assert!(!XError::NoScreens.is_ignorable());
    }
}
