//! Low-level wrappers around X server events.

use super::core::{XWindowID, StackModeRaw};
use crate::core::types::{Geometry, Point};
use crate::x::input::{keysym::KeySym, KeyCode, ModMask};

/// An event received from the X server, translated into crate types.
///
/// Every event kind the window manager reacts to has its own variant;
/// everything else is collapsed into `Unknown` and ignored by the
/// dispatcher.
#[derive(Debug, Clone)]
pub enum XEvent {
    /// A mouse button was pressed.
    ButtonPress(MouseEvent),
    /// A mouse button was released.
    ButtonRelease(MouseEvent),
    /// A client sent us a message.
    ClientMessage(ClientMessageEvent),
    /// Notification that a window's configuration has changed.
    ConfigureNotify(ConfigureEvent),
    /// A window is requesting a configuration change.
    ConfigureRequest(ConfigureRequestData),
    /// A window was destroyed.
    DestroyNotify(XWindowID),
    /// The pointer entered a window.
    EnterNotify(CrossingEvent),
    /// Part of a window was exposed.
    Expose(ExposeEvent),
    /// A window received input focus.
    FocusIn(XWindowID),
    /// A key combination was pressed.
    KeyPress(KeypressEvent),
    /// The keyboard mapping changed.
    MappingNotify(MappingEvent),
    /// A window is requesting to be mapped. The bool is the window's
    /// override-redirect flag.
    MapRequest(XWindowID, bool),
    /// The pointer moved.
    MotionNotify(PointerEvent),
    /// A window property was changed.
    PropertyNotify(PropertyEvent),
    /// A window was unmapped. The bool is whether the event was
    /// synthetic (sent by the client to request withdrawal).
    UnmapNotify(XWindowID, bool),
    /// Catchall for events not tracked by the window manager.
    Unknown(u8),
}

/// Data associated with a configure notification.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureEvent {
    /// The window associated with the event.
    pub id: XWindowID,
    /// The new geometry of the window.
    pub geom: Geometry,
    /// Whether the window is the root window.
    pub is_root: bool,
}

/// Data associated with a configure request.
///
/// Each field the requestor set in its value mask is `Some`.
#[derive(Debug, Clone, Copy)]
pub struct ConfigureRequestData {
    /// The window associated with the event.
    pub id: XWindowID,
    /// X coordinate to configure to.
    pub x: Option<i32>,
    /// Y coordinate to configure to.
    pub y: Option<i32>,
    /// Window height to configure to.
    pub height: Option<i32>,
    /// Window width to configure to.
    pub width: Option<i32>,
    /// Border width to configure to.
    pub border_width: Option<u32>,
    /// Sibling window, used with `stack_mode`.
    pub sibling: Option<XWindowID>,
    /// Stacking order to configure to.
    pub stack_mode: Option<StackModeRaw>,
}

/// Data associated with a pointer crossing event.
#[derive(Debug, Clone, Copy)]
pub struct CrossingEvent {
    /// The window the pointer crossed into.
    pub id: XWindowID,
    /// Whether the window is the root window.
    pub is_root: bool,
    /// Whether the crossing came from a normal pointer movement, as
    /// opposed to a grab activating or deactivating.
    pub normal_mode: bool,
    /// Whether the pointer only crossed into a subwindow.
    pub inferior: bool,
}

/// Data associated with an expose event.
#[derive(Debug, Clone, Copy)]
pub struct ExposeEvent {
    /// The window associated with the event.
    pub id: XWindowID,
    /// The number of expose events still to follow for this window.
    pub count: u32,
}

/// Data associated with a property change event.
#[derive(Debug, Clone, Copy)]
pub struct PropertyEvent {
    /// The window associated with the event.
    pub id: XWindowID,
    /// The atom of the property that changed.
    pub atom: u32,
    /// Whether the window is the root window.
    pub is_root: bool,
    /// Whether the property was deleted.
    pub deleted: bool,
}

/// Data associated with a keyboard mapping change.
#[derive(Debug, Clone, Copy)]
pub struct MappingEvent {
    /// Whether the keyboard mapping itself changed (as opposed to the
    /// pointer or modifier mapping).
    pub is_keyboard: bool,
}

/// Data associated with a key press event.
#[derive(Debug, Clone, Copy)]
pub struct KeypressEvent {
    /// The modifier state active at the time.
    pub mask: ModMask,
    /// The keycode of the key pressed.
    pub keycode: KeyCode,
    /// The keysym in the first column of the keycode's mapping.
    pub keysym: KeySym,
}

/// Data associated with a button press or release event.
#[derive(Debug, Clone, Copy)]
pub struct MouseEvent {
    /// The window the pointer was on when the button was pressed.
    pub id: XWindowID,
    /// The button in question, as reported by the server.
    pub button: u8,
    /// The modifier state active at the time.
    pub mask: ModMask,
    /// The location of the pointer, relative to the root.
    pub location: Point,
}

/// Data associated with a pointer motion event.
#[derive(Debug, Clone, Copy)]
pub struct PointerEvent {
    /// The window the event was reported against.
    pub id: XWindowID,
    /// Whether the window is the root window.
    pub is_root: bool,
    /// The location of the pointer, relative to the root.
    pub location: Point,
}

/// Data associated with a client message.
#[derive(Debug, Clone, Copy)]
pub struct ClientMessageEvent {
    /// The window the message concerns.
    pub window: XWindowID,
    /// The message payload.
    pub data: ClientMessageData,
    /// The atom identifying the message type.
    pub type_: u32,
}

/// The different formats of a client message's data, as specified by
/// ICCCM.
#[derive(Clone, Copy, Debug)]
pub enum ClientMessageData {
    U8([u8; 20]),
    U16([u16; 10]),
    U32([u32; 5]),
}

impl ClientMessageData {
    #[inline(always)]
    pub fn is_u8(&self) -> bool {
        matches!(self, Self::U8(_))
    }

    #[inline(always)]
    pub fn is_u16(&self) -> bool {
        matches!(self, Self::U16(_))
    }

    #[inline(always)]
    pub fn is_u32(&self) -> bool {
        matches!(self, Self::U32(_))
    }

    /// The doubleword payload, if this message is in format 32.
    pub fn as_u32(&self) -> Option<[u32; 5]> {
        if let Self::U32(data) = self {
            Some(*data)
        } else {
            None
        }
    }
}

use std::convert::TryFrom;

macro_rules! _impl_tryfrom {
    ($t:ty, $count:expr, $variant:expr) => {
        impl TryFrom<&[$t]> for ClientMessageData {
            type Error = std::array::TryFromSliceError;

            fn try_from(data: &[$t]) -> Result<Self, Self::Error> {
                Ok($variant(<[$t; $count]>::try_from(data)?))
            }
        }
    };
}

_impl_tryfrom!(u8, 20, Self::U8);
_impl_tryfrom!(u16, 10, Self::U16);
_impl_tryfrom!(u32, 5, Self::U32);
