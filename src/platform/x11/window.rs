// src/platform/x11/window.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use super::connection::Connection;
use crate::config::{WindowConfig, WindowGeometry};
use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::ffi::CString;

use libc::{c_char, c_int, c_uint};
use x11::xlib;

/// Native events the window listens for.
const EVENT_MASK: libc::c_long =
    xlib::ExposureMask | xlib::KeyPressMask | xlib::KeyReleaseMask | xlib::StructureNotifyMask;

/// An X11 top-level window.
///
/// `cleanup` must be called with the owning `Connection` before that
/// connection is dropped; `Drop` can only report a missed cleanup.
#[derive(Debug)]
pub struct Window {
    id: xlib::Window,
    wm_delete_window: xlib::Atom,
    protocols_atom: xlib::Atom,
    geometry: WindowGeometry,
}

impl Window {
    /// Creates a simple window with a black border and white background
    /// and selects key, expose and structure events on it.
    ///
    /// The window is not mapped; call [`Window::map_and_flush`].
    pub fn create(connection: &Connection, config: &WindowConfig) -> Result<Self> {
        info!(
            "Creating X11 window at ({}, {}), {}x{}px, border {}",
            config.x, config.y, config.width, config.height, config.border_width
        );
        let display = connection.display();

        let window_id = unsafe {
            xlib::XCreateSimpleWindow(
                display,
                connection.root_window(),
                config.x as c_int,
                config.y as c_int,
                config.width as c_uint,
                config.height as c_uint,
                config.border_width as c_uint,
                connection.black_pixel(),
                connection.white_pixel(),
            )
        };
        if window_id == 0 {
            return Err(anyhow!("XCreateSimpleWindow failed"));
        }

        unsafe {
            xlib::XSelectInput(display, window_id, EVENT_MASK);
        }
        debug!("X window created (ID: {})", window_id);

        let mut window = Self {
            id: window_id,
            wm_delete_window: 0,
            protocols_atom: 0,
            geometry: config.geometry(),
        };
        window.setup_protocols(connection);
        window.set_title(connection, &config.title)?;
        Ok(window)
    }

    /// Registers for `WM_DELETE_WINDOW` so closing the window arrives as a
    /// client message instead of a killed connection.
    fn setup_protocols(&mut self, connection: &Connection) {
        let display = connection.display();
        unsafe {
            self.wm_delete_window = xlib::XInternAtom(
                display,
                b"WM_DELETE_WINDOW\0".as_ptr() as *const c_char,
                xlib::False,
            );
            self.protocols_atom = xlib::XInternAtom(
                display,
                b"WM_PROTOCOLS\0".as_ptr() as *const c_char,
                xlib::False,
            );

            if self.wm_delete_window != 0 && self.protocols_atom != 0 {
                xlib::XSetWMProtocols(display, self.id, [self.wm_delete_window].as_mut_ptr(), 1);
                debug!("WM_PROTOCOLS (WM_DELETE_WINDOW) registered.");
            } else {
                warn!("Failed to get WM_DELETE_WINDOW or WM_PROTOCOLS atom. Window close events might not be received.");
            }
        }
    }

    /// Sets the window title through both `WM_NAME` and `_NET_WM_NAME`.
    pub fn set_title(&self, connection: &Connection, title: &str) -> Result<()> {
        let display = connection.display();
        let title_cstr = CString::new(title).context("Failed to create CString for title")?;
        unsafe {
            xlib::XStoreName(display, self.id, title_cstr.as_ptr() as *mut c_char);

            let net_wm_name_atom = xlib::XInternAtom(
                display,
                b"_NET_WM_NAME\0".as_ptr() as *const c_char,
                xlib::False,
            );
            let utf8_string_atom = xlib::XInternAtom(
                display,
                b"UTF8_STRING\0".as_ptr() as *const c_char,
                xlib::False,
            );
            if net_wm_name_atom != 0 && utf8_string_atom != 0 {
                xlib::XChangeProperty(
                    display,
                    self.id,
                    net_wm_name_atom,
                    utf8_string_atom,
                    8,
                    xlib::PropModeReplace,
                    title_cstr.as_ptr() as *const u8,
                    title_cstr.as_bytes().len() as c_int,
                );
            }
        }
        debug!("Window title set to: {}", title);
        Ok(())
    }

    /// Maps the window and flushes so it appears immediately.
    pub fn map_and_flush(&self, connection: &Connection) {
        info!("Mapping window ID: {} and flushing display.", self.id);
        unsafe {
            xlib::XMapWindow(connection.display(), self.id);
        }
        connection.flush();
    }

    /// Destroys the window on the server. Idempotent.
    pub fn cleanup(&mut self, connection: &Connection) {
        if self.id != 0 && !connection.display().is_null() {
            info!("Destroying X11 window (ID: {}).", self.id);
            unsafe {
                xlib::XDestroyWindow(connection.display(), self.id);
            }
            connection.flush();
            self.id = 0;
        }
    }

    #[inline]
    pub fn id(&self) -> xlib::Window {
        self.id
    }

    #[inline]
    pub fn wm_delete_window_atom(&self) -> xlib::Atom {
        self.wm_delete_window
    }

    #[inline]
    pub fn protocols_atom(&self) -> xlib::Atom {
        self.protocols_atom
    }

    #[inline]
    pub fn geometry(&self) -> WindowGeometry {
        self.geometry
    }

    /// Records a new position/size reported by `ConfigureNotify`.
    pub fn update_geometry(&mut self, geometry: WindowGeometry) {
        if self.geometry != geometry {
            debug!(
                "Window geometry changed from {:?} to {:?}",
                self.geometry, geometry
            );
            self.geometry = geometry;
        }
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        if self.id != 0 {
            error!(
                "Window (ID: {}) dropped without explicit cleanup. Server resources may be leaked.",
                self.id
            );
        }
    }
}
