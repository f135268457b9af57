// src/platform/x11/connection.rs
#![allow(non_snake_case)] // Allow non-snake case for X11 types

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use std::ptr;

use libc::{c_int, c_ulong};
use x11::xlib;

/// Owns the raw `*mut xlib::Display` and closes it on drop.
#[derive(Debug)]
struct ManagedDisplay {
    ptr: *mut xlib::Display,
}

impl ManagedDisplay {
    /// Opens the display named by `$DISPLAY`.
    fn open() -> Result<Self> {
        let display_ptr = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display_ptr.is_null() {
            Err(anyhow!(
                "Can't connect to X server. Check DISPLAY environment variable or X server status."
            ))
        } else {
            debug!("X display opened: {:p}", display_ptr);
            Ok(Self { ptr: display_ptr })
        }
    }

    #[inline]
    fn raw(&self) -> *mut xlib::Display {
        self.ptr
    }
}

impl Drop for ManagedDisplay {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            info!("Closing X11 display connection: {:p}", self.ptr);
            unsafe {
                let status = xlib::XCloseDisplay(self.ptr);
                if status != 0 {
                    warn!(
                        "XCloseDisplay returned non-zero status: {}. Display may not have closed cleanly.",
                        status
                    );
                }
            }
        }
    }
}

/// Connection to the X server plus the default-screen values window
/// creation needs.
///
/// Dropping the connection closes the display.
#[derive(Debug)]
pub struct Connection {
    managed_display: ManagedDisplay,
    screen: c_int,
    black_pixel: c_ulong,
    white_pixel: c_ulong,
}

impl Connection {
    /// Opens the display named by `$DISPLAY` (or the default server).
    ///
    /// `XInitThreads` is called first so the connection may later be used
    /// from the engine thread.
    ///
    /// # Errors
    ///
    /// Fails when no X server can be reached.
    pub fn open() -> Result<Self> {
        info!("Establishing X11 server connection.");

        // SAFETY: XInitThreads must precede any other Xlib call on this
        // connection; calling it more than once is harmless.
        if unsafe { xlib::XInitThreads() } == 0 {
            warn!("XInitThreads failed; Xlib is not thread-safe on this system.");
        }

        let managed_display = ManagedDisplay::open()?;
        let display = managed_display.raw();

        let (screen, black_pixel, white_pixel) = unsafe {
            let screen = xlib::XDefaultScreen(display);
            (
                screen,
                xlib::XBlackPixel(display, screen),
                xlib::XWhitePixel(display, screen),
            )
        };
        debug!(
            "Default screen: {}, black pixel: {}, white pixel: {}",
            screen, black_pixel, white_pixel
        );

        info!("X11 server connection established successfully.");
        Ok(Connection {
            managed_display,
            screen,
            black_pixel,
            white_pixel,
        })
    }

    /// Raw display pointer for Xlib calls.
    ///
    /// Only valid while this `Connection` is alive.
    #[inline]
    pub fn display(&self) -> *mut xlib::Display {
        self.managed_display.raw()
    }

    #[inline]
    pub fn screen(&self) -> c_int {
        self.screen
    }

    #[inline]
    pub fn black_pixel(&self) -> c_ulong {
        self.black_pixel
    }

    #[inline]
    pub fn white_pixel(&self) -> c_ulong {
        self.white_pixel
    }

    /// Root window of the default screen.
    pub fn root_window(&self) -> xlib::Window {
        unsafe { xlib::XRootWindow(self.display(), self.screen) }
    }

    /// Pushes buffered requests to the server.
    pub fn flush(&self) {
        unsafe {
            xlib::XFlush(self.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Opening a real connection needs an X server, so only the pointer
    // bookkeeping is exercised here.
    #[test_log::test]
    fn null_managed_display_drops_without_closing() {
        let display = ManagedDisplay {
            ptr: ptr::null_mut(),
        };
        assert!(display.raw().is_null());
        drop(display);
    }
}
