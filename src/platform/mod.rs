// src/platform/mod.rs
//
// Defines the `Platform` trait, which abstracts over the native windowing
// system the engine drives.

use crate::config::{WindowConfig, WindowGeometry};
use crate::event::Event;
use anyhow::Result;

#[cfg(test)]
pub mod mock;
pub mod x11;

/// The window system seam of the engine.
///
/// A platform is created on one thread and may be moved to the engine
/// thread, hence the `Send` bound. Lifecycle calls arrive in the order
/// `create_window`, `create_graphics`, `show_window`, then any number of
/// `poll_events`, then `cleanup`.
pub trait Platform: Send {
    /// Connects to the window system and creates (but does not show) the window.
    fn create_window(&mut self, config: &WindowConfig) -> Result<()>;

    /// Prepares a graphics context for the window.
    ///
    /// No backend creates one yet; implementations log and return `Ok`.
    fn create_graphics(&mut self) -> Result<()>;

    /// Makes the window visible.
    fn show_window(&mut self) -> Result<()>;

    /// Drains every pending native event without blocking and returns the
    /// ones the engine forwards. Unrelated native events are dropped.
    fn poll_events(&mut self) -> Result<Vec<Event>>;

    /// Current window geometry, `None` until a window exists.
    fn geometry(&self) -> Option<WindowGeometry>;

    /// Destroys the window and releases the connection. Idempotent.
    fn cleanup(&mut self) -> Result<()>;
}
