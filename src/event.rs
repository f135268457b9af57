// src/event.rs

//! The input events the engine forwards to user callbacks.

use crate::keys::{KeySymbol, Modifiers};

/// A single key transition, already translated out of the platform's
/// native representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Platform-neutral key symbol.
    pub symbol: KeySymbol,
    /// Modifiers held while the key changed state.
    pub modifiers: Modifiers,
    /// Raw hardware keycode as reported by the platform.
    pub keycode: u32,
    /// Text produced by the key, if any (empty for non-printing keys).
    pub text: String,
}

/// Events delivered to registered callbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    KeyPressed(KeyEvent),
    KeyReleased(KeyEvent),
    /// The window manager asked the window to close.
    CloseRequested,
}

/// Discriminant of [`Event`], used to register callbacks for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    KeyPress,
    KeyRelease,
    CloseRequested,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::KeyPressed(_) => EventKind::KeyPress,
            Event::KeyReleased(_) => EventKind::KeyRelease,
            Event::CloseRequested => EventKind::CloseRequested,
        }
    }

    /// The key payload for key events, `None` otherwise.
    pub fn key(&self) -> Option<&KeyEvent> {
        match self {
            Event::KeyPressed(key) | Event::KeyReleased(key) => Some(key),
            Event::CloseRequested => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(symbol: KeySymbol) -> KeyEvent {
        KeyEvent {
            symbol,
            modifiers: Modifiers::empty(),
            keycode: 9,
            text: String::new(),
        }
    }

    #[test_log::test]
    fn kind_matches_variant() {
        assert_eq!(
            Event::KeyPressed(key(KeySymbol::Escape)).kind(),
            EventKind::KeyPress
        );
        assert_eq!(
            Event::KeyReleased(key(KeySymbol::Escape)).kind(),
            EventKind::KeyRelease
        );
        assert_eq!(Event::CloseRequested.kind(), EventKind::CloseRequested);
    }

    #[test_log::test]
    fn key_payload_only_for_key_events() {
        let pressed = Event::KeyPressed(key(KeySymbol::Char('q')));
        assert_eq!(pressed.key().map(|k| k.symbol), Some(KeySymbol::Char('q')));
        assert!(Event::CloseRequested.key().is_none());
    }
}
