// src/keys.rs

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Represents a keyboard modifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CONTROL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
        const CAPS_LOCK = 1 << 4;
        const NUM_LOCK = 1 << 5;
    }
}

// Core X11 modifier mask bits (X.h). Kept here so the mapping can be used
// and tested without a display connection.
const X_SHIFT_MASK: u32 = 1 << 0;
const X_LOCK_MASK: u32 = 1 << 1;
const X_CONTROL_MASK: u32 = 1 << 2;
const X_MOD1_MASK: u32 = 1 << 3;
const X_MOD2_MASK: u32 = 1 << 4;
const X_MOD4_MASK: u32 = 1 << 6;

impl Modifiers {
    /// Builds the modifier set from the `state` field of an X key event.
    ///
    /// Mod1 is treated as Alt, Mod2 as NumLock and Mod4 as Super, which is
    /// the layout every mainstream X keymap ships with.
    pub fn from_x11_state(state: u32) -> Self {
        let mut modifiers = Modifiers::empty();
        if state & X_SHIFT_MASK != 0 {
            modifiers.insert(Modifiers::SHIFT);
        }
        if state & X_CONTROL_MASK != 0 {
            modifiers.insert(Modifiers::CONTROL);
        }
        if state & X_MOD1_MASK != 0 {
            modifiers.insert(Modifiers::ALT);
        }
        if state & X_MOD4_MASK != 0 {
            modifiers.insert(Modifiers::SUPER);
        }
        if state & X_LOCK_MASK != 0 {
            modifiers.insert(Modifiers::CAPS_LOCK);
        }
        if state & X_MOD2_MASK != 0 {
            modifiers.insert(Modifiers::NUM_LOCK);
        }
        modifiers
    }
}

/// Represents a key symbol.
///
/// Platform backends translate their native key codes into this enum so
/// callbacks never see backend-specific values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KeySymbol {
    // Alphanumeric keys
    Char(char),

    // Function keys
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    F21,
    F22,
    F23,
    F24,

    // Modifier keys (when pressed and released without other keys)
    Shift,
    Control,
    Alt,
    Super,
    CapsLock,
    NumLock,

    // Navigation keys
    Left,
    Right,
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Insert,
    Delete,

    // Other common keys
    Enter,
    Backspace,
    Tab,
    Escape,
    PrintScreen,
    ScrollLock,
    Pause,

    // Keypad keys
    Keypad0,
    Keypad1,
    Keypad2,
    Keypad3,
    Keypad4,
    Keypad5,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
    KeypadEnter,
    KeypadPlus,
    KeypadMinus,
    KeypadMultiply,
    KeypadDivide,
    KeypadDecimal,
    KeypadEquals,

    Menu,

    #[default]
    Unknown,
}

impl KeySymbol {
    /// Returns true if the key symbol represents a modifier key.
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            KeySymbol::Shift
                | KeySymbol::Control
                | KeySymbol::Alt
                | KeySymbol::Super
                | KeySymbol::CapsLock
                | KeySymbol::NumLock
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn empty_state_has_no_modifiers() {
        assert_eq!(Modifiers::from_x11_state(0), Modifiers::empty());
    }

    #[test_log::test]
    fn x11_state_bits_map_to_modifiers() {
        assert_eq!(Modifiers::from_x11_state(X_SHIFT_MASK), Modifiers::SHIFT);
        assert_eq!(Modifiers::from_x11_state(X_CONTROL_MASK), Modifiers::CONTROL);
        assert_eq!(Modifiers::from_x11_state(X_MOD1_MASK), Modifiers::ALT);
        assert_eq!(Modifiers::from_x11_state(X_MOD4_MASK), Modifiers::SUPER);
        assert_eq!(Modifiers::from_x11_state(X_LOCK_MASK), Modifiers::CAPS_LOCK);
        assert_eq!(Modifiers::from_x11_state(X_MOD2_MASK), Modifiers::NUM_LOCK);
    }

    #[test_log::test]
    fn combined_state_and_unrelated_bits() {
        // Mod3 (1 << 5) and button masks are not modifiers we report.
        let state = X_SHIFT_MASK | X_CONTROL_MASK | (1 << 5) | (1 << 8);
        assert_eq!(
            Modifiers::from_x11_state(state),
            Modifiers::SHIFT | Modifiers::CONTROL
        );
    }

    #[test_log::test]
    fn modifier_keys_are_recognised() {
        assert!(KeySymbol::Shift.is_modifier());
        assert!(KeySymbol::NumLock.is_modifier());
        assert!(!KeySymbol::Char('a').is_modifier());
        assert!(!KeySymbol::Escape.is_modifier());
        assert_eq!(KeySymbol::default(), KeySymbol::Unknown);
    }
}
