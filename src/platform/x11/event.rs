// src/platform/x11/event.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use super::window::Window;
use crate::config::WindowGeometry;
use crate::event::{Event, KeyEvent};
use crate::keys::{KeySymbol, Modifiers};

use anyhow::Result;
use log::{debug, info, trace, warn};
use std::mem;
use std::ptr;

use libc::{c_char, c_int};
use x11::{keysym, xlib};

/// Buffer size for text obtained from `XLookupString`.
const KEY_TEXT_BUFFER_SIZE: usize = 32;

/// Drains every event queued on the connection and translates the ones the
/// engine cares about.
///
/// `XPending` is checked before each `XNextEvent`, so this never blocks.
/// `ConfigureNotify` only updates the window's cached geometry.
pub fn process_pending_events(connection: &Connection, window: &mut Window) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    let display = connection.display();

    while unsafe { xlib::XPending(display) } > 0 {
        let mut xevent: xlib::XEvent = unsafe { mem::zeroed() };
        // SAFETY: XPending reported at least one queued event, so XNextEvent
        // returns without blocking and fully initialises `xevent`.
        unsafe { xlib::XNextEvent(display, &mut xevent) };

        let event_type = xevent.get_type();
        match event_type {
            xlib::KeyPress | xlib::KeyRelease => {
                // SAFETY: the type tag says this is a key event.
                let key_event = unsafe { &mut xevent.key };
                let key = translate_key_event(key_event);
                if event_type == xlib::KeyPress {
                    debug!("XEvent: KeyPress {:?} on window {}", key, key_event.window);
                    events.push(Event::KeyPressed(key));
                } else {
                    debug!("XEvent: KeyRelease {:?} on window {}", key, key_event.window);
                    events.push(Event::KeyReleased(key));
                }
            }
            xlib::ClientMessage => {
                let client_message = unsafe { xevent.client_message };
                if client_message.message_type == window.protocols_atom()
                    && client_message.data.as_longs()[0] as xlib::Atom
                        == window.wm_delete_window_atom()
                {
                    info!(
                        "XEvent: WM_DELETE_WINDOW received for window {}.",
                        client_message.window
                    );
                    events.push(Event::CloseRequested);
                } else {
                    trace!(
                        "XEvent: Ignored ClientMessage (type: {}) on window {}",
                        client_message.message_type,
                        client_message.window
                    );
                }
            }
            xlib::ConfigureNotify => {
                let configure = unsafe { xevent.configure };
                window.update_geometry(WindowGeometry {
                    x: configure.x,
                    y: configure.y,
                    width: configure.width.max(0) as u32,
                    height: configure.height.max(0) as u32,
                });
            }
            xlib::Expose => {
                let expose = unsafe { xevent.expose };
                if expose.count == 0 {
                    trace!("XEvent: Expose on window {} (nothing to redraw)", expose.window);
                }
            }
            _ => {
                trace!("XEvent: Ignored (type: {})", event_type);
            }
        }
    }
    Ok(events)
}

/// Resolves keysym, text and modifiers for a key press or release.
fn translate_key_event(key_event: &mut xlib::XKeyEvent) -> KeyEvent {
    let mut x_keysym: xlib::KeySym = 0;
    let mut key_text_buffer = [0u8; KEY_TEXT_BUFFER_SIZE];

    // SAFETY: `key_event` points at a live XKeyEvent and the buffer length
    // is passed alongside it. No compose status is requested.
    let count = unsafe {
        xlib::XLookupString(
            key_event,
            key_text_buffer.as_mut_ptr() as *mut c_char,
            key_text_buffer.len() as c_int,
            &mut x_keysym,
            ptr::null_mut(),
        )
    };

    let text = if count > 0 {
        String::from_utf8_lossy(&key_text_buffer[..count as usize]).into_owned()
    } else {
        String::new()
    };

    KeyEvent {
        symbol: xkeysym_to_keysymbol(x_keysym, &text),
        modifiers: Modifiers::from_x11_state(key_event.state),
        keycode: key_event.keycode,
        text,
    }
}

/// Translates an X11 KeySym plus the `XLookupString` text into a
/// [`KeySymbol`].
///
/// A single printable character in `text` wins, which covers ordinary keys
/// and keypad digits with NumLock on. Otherwise the keysym table decides,
/// so Ctrl+q (text "\x11") still reports `Char('q')`.
pub(crate) fn xkeysym_to_keysymbol(keysym_val: xlib::KeySym, text: &str) -> KeySymbol {
    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c != '\u{FFFD}' && !c.is_control() {
            return KeySymbol::Char(c);
        }
    }

    if keysym_val > u32::MAX as xlib::KeySym {
        warn!(
            "Received high keysym value: 0x{:X} with no usable text (text='{}'), mapping to Unknown.",
            keysym_val, text
        );
        return KeySymbol::Unknown;
    }

    match keysym_val as u32 {
        keysym::XK_Shift_L | keysym::XK_Shift_R => KeySymbol::Shift,
        keysym::XK_Control_L | keysym::XK_Control_R => KeySymbol::Control,
        keysym::XK_Alt_L | keysym::XK_Alt_R | keysym::XK_Meta_L | keysym::XK_Meta_R => {
            KeySymbol::Alt
        }
        keysym::XK_Super_L | keysym::XK_Super_R | keysym::XK_Hyper_L | keysym::XK_Hyper_R => {
            KeySymbol::Super
        }
        keysym::XK_Caps_Lock => KeySymbol::CapsLock,
        keysym::XK_Num_Lock => KeySymbol::NumLock,

        keysym::XK_Return => KeySymbol::Enter,
        keysym::XK_KP_Enter => KeySymbol::KeypadEnter,
        keysym::XK_BackSpace => KeySymbol::Backspace,
        keysym::XK_Tab | keysym::XK_KP_Tab | keysym::XK_ISO_Left_Tab => KeySymbol::Tab,
        keysym::XK_Escape => KeySymbol::Escape,

        keysym::XK_Home | keysym::XK_KP_Home => KeySymbol::Home,
        keysym::XK_Left | keysym::XK_KP_Left => KeySymbol::Left,
        keysym::XK_Up | keysym::XK_KP_Up => KeySymbol::Up,
        keysym::XK_Right | keysym::XK_KP_Right => KeySymbol::Right,
        keysym::XK_Down | keysym::XK_KP_Down => KeySymbol::Down,
        keysym::XK_Page_Up | keysym::XK_KP_Page_Up => KeySymbol::PageUp,
        keysym::XK_Page_Down | keysym::XK_KP_Page_Down => KeySymbol::PageDown,
        keysym::XK_End | keysym::XK_KP_End => KeySymbol::End,
        keysym::XK_Insert | keysym::XK_KP_Insert => KeySymbol::Insert,
        keysym::XK_Delete | keysym::XK_KP_Delete => KeySymbol::Delete,

        keysym::XK_F1 => KeySymbol::F1,
        keysym::XK_F2 => KeySymbol::F2,
        keysym::XK_F3 => KeySymbol::F3,
        keysym::XK_F4 => KeySymbol::F4,
        keysym::XK_F5 => KeySymbol::F5,
        keysym::XK_F6 => KeySymbol::F6,
        keysym::XK_F7 => KeySymbol::F7,
        keysym::XK_F8 => KeySymbol::F8,
        keysym::XK_F9 => KeySymbol::F9,
        keysym::XK_F10 => KeySymbol::F10,
        keysym::XK_F11 => KeySymbol::F11,
        keysym::XK_F12 => KeySymbol::F12,
        keysym::XK_F13 => KeySymbol::F13,
        keysym::XK_F14 => KeySymbol::F14,
        keysym::XK_F15 => KeySymbol::F15,
        keysym::XK_F16 => KeySymbol::F16,
        keysym::XK_F17 => KeySymbol::F17,
        keysym::XK_F18 => KeySymbol::F18,
        keysym::XK_F19 => KeySymbol::F19,
        keysym::XK_F20 => KeySymbol::F20,
        keysym::XK_F21 => KeySymbol::F21,
        keysym::XK_F22 => KeySymbol::F22,
        keysym::XK_F23 => KeySymbol::F23,
        keysym::XK_F24 => KeySymbol::F24,

        keysym::XK_KP_0 => KeySymbol::Keypad0,
        keysym::XK_KP_1 => KeySymbol::Keypad1,
        keysym::XK_KP_2 => KeySymbol::Keypad2,
        keysym::XK_KP_3 => KeySymbol::Keypad3,
        keysym::XK_KP_4 => KeySymbol::Keypad4,
        keysym::XK_KP_5 | keysym::XK_KP_Begin => KeySymbol::Keypad5,
        keysym::XK_KP_6 => KeySymbol::Keypad6,
        keysym::XK_KP_7 => KeySymbol::Keypad7,
        keysym::XK_KP_8 => KeySymbol::Keypad8,
        keysym::XK_KP_9 => KeySymbol::Keypad9,
        keysym::XK_KP_Decimal | keysym::XK_KP_Separator => KeySymbol::KeypadDecimal,
        keysym::XK_KP_Add => KeySymbol::KeypadPlus,
        keysym::XK_KP_Subtract => KeySymbol::KeypadMinus,
        keysym::XK_KP_Multiply => KeySymbol::KeypadMultiply,
        keysym::XK_KP_Divide => KeySymbol::KeypadDivide,
        keysym::XK_KP_Equal => KeySymbol::KeypadEquals,
        keysym::XK_KP_Space => KeySymbol::Char(' '),

        keysym::XK_Print | keysym::XK_Sys_Req => KeySymbol::PrintScreen,
        keysym::XK_Scroll_Lock => KeySymbol::ScrollLock,
        keysym::XK_Pause | keysym::XK_Break => KeySymbol::Pause,
        keysym::XK_Menu => KeySymbol::Menu,

        // Latin-1 keysyms equal their code point. Reached when Ctrl turns the
        // text into a control character or no text was produced at all.
        latin1 @ (0x20..=0x7e | 0xa0..=0xff) => {
            char::from_u32(latin1).map_or(KeySymbol::Unknown, KeySymbol::Char)
        }

        other => {
            trace!(
                "Unhandled keysym 0x{:X} with text '{}', mapping to KeySymbol::Unknown",
                other,
                text
            );
            KeySymbol::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ks(sym: u32) -> xlib::KeySym {
        sym as xlib::KeySym
    }

    #[test_log::test]
    fn special_keys_map_without_text() {
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_Return), ""), KeySymbol::Enter);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_Escape), ""), KeySymbol::Escape);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_BackSpace), ""), KeySymbol::Backspace);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_Shift_L), ""), KeySymbol::Shift);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_Control_R), ""), KeySymbol::Control);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_Left), ""), KeySymbol::Left);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_F12), ""), KeySymbol::F12);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_KP_Begin), ""), KeySymbol::Keypad5);
    }

    #[test_log::test]
    fn printable_text_wins_over_keysym() {
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_a), "a"), KeySymbol::Char('a'));
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_A), "A"), KeySymbol::Char('A'));
        // Keypad digit with NumLock on.
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_KP_7), "7"), KeySymbol::Char('7'));
    }

    #[test_log::test]
    fn control_text_falls_back_to_keysym() {
        // XLookupString yields "\r" for Return and "\x1b" for Escape.
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_Return), "\r"), KeySymbol::Enter);
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_Escape), "\u{1b}"), KeySymbol::Escape);
    }

    #[test_log::test]
    fn ctrl_letter_keeps_the_letter_from_the_keysym() {
        // XLookupString yields "\x11" for Ctrl+q and "\x03" for Ctrl+c.
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_q), "\u{11}"), KeySymbol::Char('q'));
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_c), "\u{3}"), KeySymbol::Char('c'));
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_a), ""), KeySymbol::Char('a'));
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_space), ""), KeySymbol::Char(' '));
        assert_eq!(xkeysym_to_keysymbol(ks(keysym::XK_eacute), ""), KeySymbol::Char('é'));
    }

    #[test_log::test]
    fn unmapped_keysyms_are_unknown() {
        assert_eq!(xkeysym_to_keysymbol(0, ""), KeySymbol::Unknown);
        // Latin-1 control range, and Greek alpha (0x7e1) without text.
        assert_eq!(xkeysym_to_keysymbol(0x9f, ""), KeySymbol::Unknown);
        assert_eq!(xkeysym_to_keysymbol(0x7e1, ""), KeySymbol::Unknown);
    }
}
