//! Types for creating key and mouse bindings.
//!
//! A binding pairs a [`Keybind`] or [`Mousebind`] with an [`Action`].
//! Actions carry their argument in the variant itself, so a binding
//! table is fully type-checked the moment it is built.

use std::collections::HashMap;

use crate::core::types::{Direction, MonitorDir};
use crate::x::core::XError;
use crate::x::event::{KeypressEvent, MouseEvent};
use crate::x::input::{keysym::KeySym, ModMask};

/// A modifier key tied to a certain binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModKey {
    /// The Ctrl key.
    Ctrl,
    /// The Alt key.
    Alt,
    /// The Shift key.
    Shift,
    /// The Super/Meta key.
    Meta,
}

/// A mouse button tied to a certain binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonIndex {
    /// The left mouse button.
    Left,
    /// The middle mouse button.
    Middle,
    /// The right mouse button.
    Right,
    /// Scroll wheel up.
    Button4,
    /// Scroll wheel down.
    Button5,
}

impl TryFrom<u8> for ButtonIndex {
    type Error = XError;

    fn try_from(from: u8) -> Result<ButtonIndex, XError> {
        match from {
            1 => Ok(ButtonIndex::Left),
            2 => Ok(ButtonIndex::Middle),
            3 => Ok(ButtonIndex::Right),
            4 => Ok(ButtonIndex::Button4),
            5 => Ok(ButtonIndex::Button5),
            _ => Err(XError::ConversionError),
        }
    }
}

#[doc(hidden)]
impl From<Vec<ModKey>> for ModMask {
    fn from(from: Vec<ModKey>) -> ModMask {
        from.into_iter().fold(ModMask::empty(), |acc, n| match n {
            ModKey::Ctrl => acc | ModMask::CONTROL,
            ModKey::Alt => acc | ModMask::MOD1,
            ModKey::Shift => acc | ModMask::SHIFT,
            ModKey::Meta => acc | ModMask::MOD4,
        })
    }
}

/// A key combination that can trigger an action.
///
/// Keybinds are expressed by keysym, not keycode; the connection
/// resolves them against the current keyboard mapping when grabbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keybind {
    pub(crate) modmask: ModMask,
    pub(crate) keysym: KeySym,
}

impl Keybind {
    /// Creates a new Keybind.
    pub fn new<M: Into<ModMask>>(modifiers: M, keysym: KeySym) -> Self {
        Self {
            modmask: modifiers.into(),
            keysym,
        }
    }
}

impl From<&KeypressEvent> for Keybind {
    fn from(from: &KeypressEvent) -> Keybind {
        Keybind {
            modmask: from.mask.clean(),
            keysym: from.keysym,
        }
    }
}

/// A mouse button combination that can trigger an action on a client
/// window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mousebind {
    pub(crate) modmask: ModMask,
    pub(crate) button: ButtonIndex,
}

impl Mousebind {
    /// Creates a new Mousebind.
    pub fn new<M: Into<ModMask>>(modifiers: M, button: ButtonIndex) -> Self {
        Self {
            modmask: modifiers.into(),
            button,
        }
    }
}

/// Convenience function for constructing a keybind.
pub fn kb(modifiers: Vec<ModKey>, keysym: KeySym) -> Keybind {
    Keybind::new(modifiers, keysym)
}

/// Convenience function for constructing a mousebind.
pub fn mb(modifiers: Vec<ModKey>, button: ButtonIndex) -> Mousebind {
    Mousebind::new(modifiers, button)
}

/// A user-facing operation, with its argument baked into the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Run an external command.
    Spawn(Vec<String>),
    /// Show or hide the bar on the selected monitor.
    ToggleBar,
    /// Move focus along the visible clients of the selected monitor.
    FocusStack(Direction),
    /// Refocus the previously focused client.
    SwapFocus,
    /// Swap the selected client with its tiled neighbor.
    MoveStack(Direction),
    /// Adjust the configured master count by the given amount.
    IncNMaster(i32),
    /// Adjust the master area factor. Values with magnitude below 1.0
    /// are relative; larger values set `value - 1.0` absolutely.
    SetMfact(f32),
    /// Adjust the gap between windows by the given amount.
    IncGap(i32),
    /// Switch the view to the given tag mask. A mask of zero flips back
    /// to the previously viewed tag-set.
    View(u32),
    /// XOR the given mask into the viewed tag-set.
    ToggleView(u32),
    /// Move the selected client to the given tags.
    Tag(u32),
    /// XOR the given mask into the selected client's tags.
    ToggleTag(u32),
    /// Politely ask the selected client to close, or disconnect it if
    /// it does not speak `WM_DELETE_WINDOW`.
    KillClient,
    /// Switch the selected monitor to the layout at this index in the
    /// layout table.
    SetLayout(usize),
    /// Toggle the selected client in or out of the tiled layout.
    ToggleFloating,
    /// Toggle the selected client's fullscreen state.
    ToggleFullscreen,
    /// Focus another monitor.
    FocusMonitor(MonitorDir),
    /// Focus another monitor, warping the pointer to it.
    FocusMonitorWarp(MonitorDir),
    /// Send the selected client to another monitor.
    TagMonitor(MonitorDir),
    /// Start a pointer-driven move of the selected client.
    MoveMouse,
    /// Start a pointer-driven resize of the selected client.
    ResizeMouse,
    /// Shut the window manager down.
    Quit,
}

/// A table mapping keybinds to the actions they invoke.
#[derive(Debug, Clone, Default)]
pub struct Keybinds {
    bindings: HashMap<Keybind, Action>,
}

impl Keybinds {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Returns an iterator over the keybinds stored inside.
    pub fn keys(&self) -> impl Iterator<Item = &Keybind> {
        self.bindings.keys()
    }

    /// Inserts a new keybind-action mapping.
    pub fn insert(&mut self, bind: Keybind, action: Action) {
        self.bindings.insert(bind, action);
    }

    /// Looks up the action bound to a key press, under a cleaned
    /// modifier mask.
    pub fn lookup(&self, event: &KeypressEvent) -> Option<&Action> {
        self.bindings.get(&Keybind::from(event))
    }
}

/// A table mapping mousebinds to the actions they invoke.
#[derive(Debug, Clone, Default)]
pub struct Mousebinds {
    bindings: HashMap<Mousebind, Action>,
}

impl Mousebinds {
    /// Creates a new empty table.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Returns an iterator over the mousebinds stored inside.
    pub fn keys(&self) -> impl Iterator<Item = &Mousebind> {
        self.bindings.keys()
    }

    /// Inserts a new mousebind-action mapping.
    pub fn insert(&mut self, bind: Mousebind, action: Action) {
        self.bindings.insert(bind, action);
    }

    /// Looks up the action bound to a button press, under a cleaned
    /// modifier mask.
    pub fn lookup(&self, event: &MouseEvent) -> Option<&Action> {
        let button = ButtonIndex::try_from(event.button).ok()?;
        self.bindings.get(&Mousebind {
            modmask: event.mask.clean(),
            button,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Point;
    use crate::x::input::keysym::XK_j;

    #[test]
    fn keybind_lookup_strips_lock_modifiers() {
        let mut binds = Keybinds::new();
        binds.insert(
            kb(vec![ModKey::Alt], XK_j),
            Action::FocusStack(Direction::Forward),
        );

        let event = KeypressEvent {
            mask: ModMask::MOD1 | ModMask::LOCK | ModMask::MOD2,
            keycode: 44,
            keysym: XK_j,
        };

        assert_eq!(
            binds.lookup(&event),
            Some(&Action::FocusStack(Direction::Forward))
        );
    }

    #[test]
    fn mousebind_lookup_matches_button_and_mask() {
        let mut binds = Mousebinds::new();
        binds.insert(mb(vec![ModKey::Alt], ButtonIndex::Left), Action::MoveMouse);

        let event = MouseEvent {
            id: 42,
            button: 1,
            mask: ModMask::MOD1 | ModMask::MOD2,
            location: Point::new(5, 5),
        };
        assert_eq!(binds.lookup(&event), Some(&Action::MoveMouse));

        let wrong_mods = MouseEvent {
            mask: ModMask::MOD4,
            ..event
        };
        assert_eq!(binds.lookup(&wrong_mods), None);
    }
}
