//! Known atoms, and a registry caching their interned server IDs.

use std::collections::HashMap;

use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use super::core::XAtom;

/// Symbolic names for the protocol atoms the window manager uses.
///
/// This allows for some measure of type safety when dealing with atoms,
/// instead of passing raw strings around.
#[derive(AsRefStr, Display, EnumString, EnumIter, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Atom {
    /// ATOM
    #[strum(serialize = "ATOM")]
    Atom,
    /// WINDOW
    #[strum(serialize = "WINDOW")]
    Window,
    /// CARDINAL
    #[strum(serialize = "CARDINAL")]
    Cardinal,
    /// UTF8_STRING
    #[strum(serialize = "UTF8_STRING")]
    UTF8String,
    /// WM_CLASS
    #[strum(serialize = "WM_CLASS")]
    WmClass,
    /// WM_NAME
    #[strum(serialize = "WM_NAME")]
    WmName,
    /// WM_HINTS
    #[strum(serialize = "WM_HINTS")]
    WmHints,
    /// WM_NORMAL_HINTS
    #[strum(serialize = "WM_NORMAL_HINTS")]
    WmNormalHints,
    /// WM_PROTOCOLS
    #[strum(serialize = "WM_PROTOCOLS")]
    WmProtocols,
    /// WM_DELETE_WINDOW
    #[strum(serialize = "WM_DELETE_WINDOW")]
    WmDeleteWindow,
    /// WM_TAKE_FOCUS
    #[strum(serialize = "WM_TAKE_FOCUS")]
    WmTakeFocus,
    /// WM_STATE
    #[strum(serialize = "WM_STATE")]
    WmState,
    /// WM_TRANSIENT_FOR
    #[strum(serialize = "WM_TRANSIENT_FOR")]
    WmTransientFor,
    /// _NET_SUPPORTED
    #[strum(serialize = "_NET_SUPPORTED")]
    NetSupported,
    /// _NET_ACTIVE_WINDOW
    #[strum(serialize = "_NET_ACTIVE_WINDOW")]
    NetActiveWindow,
    /// _NET_CLIENT_LIST
    #[strum(serialize = "_NET_CLIENT_LIST")]
    NetClientList,
    /// _NET_WM_NAME
    #[strum(serialize = "_NET_WM_NAME")]
    NetWmName,
    /// _NET_WM_STATE
    #[strum(serialize = "_NET_WM_STATE")]
    NetWmState,
    /// _NET_WM_STATE_FULLSCREEN
    #[strum(serialize = "_NET_WM_STATE_FULLSCREEN")]
    NetWmStateFullscreen,
    /// _NET_WM_WINDOW_TYPE
    #[strum(serialize = "_NET_WM_WINDOW_TYPE")]
    NetWmWindowType,
    /// _NET_WM_WINDOW_TYPE_DIALOG
    #[strum(serialize = "_NET_WM_WINDOW_TYPE_DIALOG")]
    NetWmWindowTypeDialog,
}

impl Atom {
    /// The atoms advertised in `_NET_SUPPORTED`.
    pub fn ewmh_supported() -> [Atom; 8] {
        [
            Atom::NetSupported,
            Atom::NetActiveWindow,
            Atom::NetClientList,
            Atom::NetWmName,
            Atom::NetWmState,
            Atom::NetWmStateFullscreen,
            Atom::NetWmWindowType,
            Atom::NetWmWindowTypeDialog,
        ]
    }
}

/// A two-way map between atom names and their interned server IDs.
///
/// Populated once when the connection is initialized; unknown atoms
/// encountered later are interned on demand and cached.
#[derive(Debug, Clone, Default)]
pub struct Atoms {
    to_id: HashMap<String, XAtom>,
    to_name: HashMap<XAtom, String>,
}

impl Atoms {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            to_id: HashMap::new(),
            to_name: HashMap::new(),
        }
    }

    /// Inserts a name-ID mapping.
    pub fn insert(&mut self, name: &str, id: XAtom) {
        self.to_id.insert(name.into(), id);
        self.to_name.insert(id, name.into());
    }

    /// Looks up the server ID for a known atom name.
    pub fn retrieve(&self, name: &str) -> Option<XAtom> {
        self.to_id.get(name).copied()
    }

    /// Looks up the name for a known server ID.
    pub fn retrieve_by_id(&self, id: XAtom) -> Option<&str> {
        self.to_name.get(&id).map(|s| s.as_str())
    }

    /// Iterates over all known atom names this registry should intern.
    pub fn known() -> impl Iterator<Item = Atom> {
        Atom::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn atom_string_round_trip() {
        assert_eq!(Atom::NetWmStateFullscreen.as_ref(), "_NET_WM_STATE_FULLSCREEN");
        assert_eq!(Atom::from_str("WM_DELETE_WINDOW").unwrap(), Atom::WmDeleteWindow);
    }

    #[test]
    fn registry_is_bidirectional() {
        let mut atoms = Atoms::new();
        atoms.insert(Atom::WmState.as_ref(), 341);

        assert_eq!(atoms.retrieve("WM_STATE"), Some(341));
        assert_eq!(atoms.retrieve_by_id(341), Some("WM_STATE"));
        assert_eq!(atoms.retrieve("WM_NAME"), None);
    }
}
