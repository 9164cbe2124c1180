//! Type definitions for input-related types defined by the X protocol.

use bitflags::bitflags;

use crate::bindings::{ButtonIndex, ModKey};

//* Re-exports
pub mod keysym {
    //! Keysym definitions, re-exported from the x11 crate.
    pub type KeySym = u32;
    pub use x11::keysym::*;
}

/// A keycode as received from the X server.
pub type KeyCode = u8;

bitflags! {

/// Bitmask representing one or a combination of modifier keys.
///
/// See definition in the X Server Protocol.
pub struct ModMask: u16 {
    /// The Shift key.
    const SHIFT   = 1 << 0;
    /// The Capslock key.
    const LOCK    = 1 << 1;
    /// The Control key.
    const CONTROL = 1 << 2;
    /// The Alt key.
    const MOD1    = 1 << 3;
    /// The Numlock key.
    const MOD2    = 1 << 4;
    const MOD3    = 1 << 5;
    /// The Super/Meta/Windows key.
    const MOD4    = 1 << 6;
    const MOD5    = 1 << 7;
}

/// Bitmask representing one or a combination of mouse buttons.
pub struct ButtonMask: u16 {
    const M1 = 1 << 8;
    const M2 = 1 << 9;
    const M3 = 1 << 10;
    const M4 = 1 << 11;
    const M5 = 1 << 12;
}

}

/// The set of modifier combinations every grab is repeated under, so
/// that bindings fire regardless of Numlock and Capslock state.
pub(crate) const GRAB_MODIFIERS: [ModMask; 4] = [
    ModMask::empty(),
    ModMask::LOCK,
    ModMask::MOD2,
    ModMask::from_bits_truncate(ModMask::LOCK.bits() | ModMask::MOD2.bits()),
];

impl ModMask {
    /// Strips the Numlock and Capslock bits from a modifier state, so
    /// event state can be compared against configured bindings.
    pub fn clean(self) -> ModMask {
        self & !(ModMask::LOCK | ModMask::MOD2)
    }
}

impl From<ModKey> for ModMask {
    fn from(from: ModKey) -> ModMask {
        match from {
            ModKey::Alt => ModMask::MOD1,
            ModKey::Shift => ModMask::SHIFT,
            ModKey::Ctrl => ModMask::CONTROL,
            ModKey::Meta => ModMask::MOD4,
        }
    }
}

impl From<ButtonIndex> for ButtonMask {
    fn from(from: ButtonIndex) -> ButtonMask {
        match from {
            ButtonIndex::Left => ButtonMask::M1,
            ButtonIndex::Middle => ButtonMask::M2,
            ButtonIndex::Right => ButtonMask::M3,
            ButtonIndex::Button4 => ButtonMask::M4,
            ButtonIndex::Button5 => ButtonMask::M5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_strips_lock_bits_only() {
        let state = ModMask::MOD1 | ModMask::SHIFT | ModMask::LOCK | ModMask::MOD2;

        assert_eq!(state.clean(), ModMask::MOD1 | ModMask::SHIFT);
        assert_eq!(ModMask::MOD4.clean(), ModMask::MOD4);
    }

    #[test]
    fn grab_modifiers_cover_all_lock_combinations() {
        assert!(GRAB_MODIFIERS.contains(&ModMask::empty()));
        assert!(GRAB_MODIFIERS.contains(&(ModMask::LOCK | ModMask::MOD2)));
    }
}
