// src/platform/x11/mod.rs

//! Xlib implementation of [`Platform`].

pub mod connection;
pub mod event;
pub mod window;

use self::connection::Connection;
use self::window::Window;
use crate::config::{WindowConfig, WindowGeometry};
use crate::event::Event;
use crate::platform::Platform;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};

/// A single X11 window and the display connection it lives on.
#[derive(Debug, Default)]
pub struct X11Platform {
    connection: Option<Connection>,
    window: Option<Window>,
}

// SAFETY: Xlib handles are raw pointers and therefore not `Send`. The
// connection is opened after `XInitThreads` and the platform is only ever
// owned (and used) by one thread at a time; the engine hands it over to its
// thread and takes it back on join.
unsafe impl Send for X11Platform {}

impl X11Platform {
    pub fn new() -> Self {
        Self::default()
    }

    fn parts(&mut self) -> Result<(&Connection, &mut Window)> {
        match (self.connection.as_ref(), self.window.as_mut()) {
            (Some(connection), Some(window)) => Ok((connection, window)),
            _ => Err(anyhow!("X11 window has not been created")),
        }
    }
}

impl Platform for X11Platform {
    fn create_window(&mut self, config: &WindowConfig) -> Result<()> {
        if self.window.is_some() {
            bail!("X11 window already created");
        }
        let connection = Connection::open().context("Failed to connect to the X server")?;
        let window = Window::create(&connection, config).context("Failed to create X11 window")?;
        self.connection = Some(connection);
        self.window = Some(window);
        Ok(())
    }

    fn create_graphics(&mut self) -> Result<()> {
        // TODO: create a GLX context once a rendering API exists.
        info!("Graphics context creation is not implemented; window has no drawing surface.");
        Ok(())
    }

    fn show_window(&mut self) -> Result<()> {
        let (connection, window) = self.parts()?;
        window.map_and_flush(connection);
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<Event>> {
        let (connection, window) = self.parts()?;
        event::process_pending_events(connection, window)
    }

    fn geometry(&self) -> Option<WindowGeometry> {
        self.window.as_ref().map(Window::geometry)
    }

    fn cleanup(&mut self) -> Result<()> {
        if let Some(mut window) = self.window.take() {
            match self.connection.as_ref() {
                Some(connection) => window.cleanup(connection),
                None => debug!("No connection left to destroy window {}", window.id()),
            }
        }
        if self.connection.take().is_some() {
            debug!("X11 connection released.");
        }
        Ok(())
    }
}

impl Drop for X11Platform {
    fn drop(&mut self) {
        // Window must be destroyed while the connection is still open.
        let _ = self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn fresh_platform_has_no_window() {
        let platform = X11Platform::new();
        assert!(platform.geometry().is_none());
    }

    #[test_log::test]
    fn operations_before_create_window_fail() {
        let mut platform = X11Platform::new();
        assert!(platform.show_window().is_err());
        assert!(platform.poll_events().is_err());
    }

    #[test_log::test]
    fn cleanup_without_window_is_ok_and_idempotent() -> Result<()> {
        let mut platform = X11Platform::new();
        platform.cleanup()?;
        platform.cleanup()?;
        Ok(())
    }
}
