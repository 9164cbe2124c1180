//! Types for representing X server properties.

use crate::x::core::{XConn, XWindowID};

/// An X server property, decoded into a crate-native representation.
#[derive(Debug, Clone)]
pub enum Property {
    /// a list of Atoms, expressed as strings.
    Atom(Vec<String>),

    /// a cardinal number.
    Cardinal(u32),

    /// a list of strings.
    String(Vec<String>),

    /// a list of UTF-8 encoded strings.
    UTF8String(Vec<String>),

    /// a list of window IDs.
    Window(Vec<XWindowID>),

    /// WM_HINTS.
    WMHints(WmHints),

    /// WM_SIZE_HINTS.
    WMSizeHints(WmSizeHints),

    /// Raw data as a vec of bytes.
    ///
    /// Returned if the format of the response is 8 and the type is not
    /// otherwise recognized. The String is the type name.
    U8List(String, Vec<u8>),

    /// Raw data as a vec of words; see `U8List`.
    U16List(String, Vec<u16>),

    /// Raw data as a vec of doublewords; see `U8List`.
    U32List(String, Vec<u32>),
}

impl Property {
    /// If the property is `Self::Atom(_)`, resolve its strings into
    /// server atom IDs via the given connection.
    pub fn as_atoms<X: XConn>(&self, conn: &X) -> Option<Vec<u32>> {
        if let Self::Atom(strings) = self {
            let mut atoms = Vec::with_capacity(strings.len());
            for s in strings {
                atoms.push(conn.atom(s).ok()?)
            }
            Some(atoms)
        } else {
            None
        }
    }

    /// If the property holds exactly one string, return it.
    pub fn into_single_string(self) -> Option<String> {
        match self {
            Self::String(mut ss) | Self::UTF8String(mut ss) => {
                if ss.is_empty() {
                    None
                } else {
                    Some(ss.remove(0))
                }
            }
            _ => None,
        }
    }
}

// generate Property::is_<var> methods
macro_rules! derive_is {
    ($name:ident, $var:pat) => {
        impl Property {
            pub fn $name(&self) -> bool {
                matches!(self, $var)
            }
        }
    };
}

derive_is!(is_atom, Self::Atom(_));
derive_is!(is_card, Self::Cardinal(_));
derive_is!(is_string, Self::String(_));
derive_is!(is_utf8str, Self::UTF8String(_));
derive_is!(is_window, Self::Window(_));
derive_is!(is_wmhints, Self::WMHints(_));
derive_is!(is_sizehints, Self::WMSizeHints(_));

/// The ICCCM-defined window states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

/// ICCCM-defined window hints (WM_HINTS).
#[derive(Debug, Clone, Copy)]
pub struct WmHints {
    /// The state the client wants to start in when first mapped.
    pub initial_state: WindowState,
    /// Whether the client is requesting user attention.
    pub urgent: bool,
    /// Whether the client participates in input focus handling.
    ///
    /// `None` if the InputHint flag was unset.
    pub input: Option<bool>,
}

impl WmHints {
    pub fn zeroed() -> Self {
        WmHints {
            initial_state: WindowState::Normal,
            urgent: false,
            input: None,
        }
    }
}

/// ICCCM-defined window size hints (WM_NORMAL_HINTS).
///
/// All fields are `(width, height)` pairs except the aspect ratios,
/// which are `(numerator, denominator)`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct WmSizeHints {
    /// User/program specified position.
    pub position: Option<(i32, i32)>,
    /// User/program specified size.
    pub size: Option<(i32, i32)>,
    /// The minimum size the client will accept.
    pub min_size: Option<(i32, i32)>,
    /// The maximum size the client will accept.
    pub max_size: Option<(i32, i32)>,
    /// Size increments the client resizes by.
    pub resize_inc: Option<(i32, i32)>,
    /// Minimum aspect ratio.
    pub min_aspect: Option<(i32, i32)>,
    /// Maximum aspect ratio.
    pub max_aspect: Option<(i32, i32)>,
    /// The base size of the client.
    pub base_size: Option<(i32, i32)>,
}
