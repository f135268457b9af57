// src/lib.rs

//! A minimal windowing shell: a singleton engine that opens one X11 window,
//! optionally polls it from a background thread, and forwards key events to
//! registered callbacks.

pub mod config;
pub mod engine;
pub mod event;
pub mod keys;
pub mod platform;

pub use config::{Config, WindowGeometry, CONFIG};
pub use engine::{Engine, RunState, StopHandle};
pub use event::{Event, EventKind, KeyEvent};
pub use keys::{KeySymbol, Modifiers};
