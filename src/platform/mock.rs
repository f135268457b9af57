// src/platform/mock.rs

use crate::config::{WindowConfig, WindowGeometry};
use crate::event::Event;
use crate::platform::Platform;
use anyhow::{bail, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Lifecycle calls recorded by [`MockPlatform`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    CreateWindow(WindowGeometry),
    CreateGraphics,
    ShowWindow,
    Poll,
    Cleanup,
}

/// State shared between a `MockPlatform` and the test that scripts it, so
/// the test can keep observing after the platform moved to the engine thread.
#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<MockCall>,
    pub pending: VecDeque<Vec<Event>>,
    pub fail_next_poll: bool,
    pub fail_create_window: bool,
    /// Geometry the window takes on at the next poll, like a resize.
    pub resize_on_next_poll: Option<WindowGeometry>,
}

pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
    geometry: Option<WindowGeometry>,
    cleaned_up: bool,
}

impl MockPlatform {
    pub fn new() -> (Self, Arc<Mutex<MockState>>) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: Arc::clone(&state),
                geometry: None,
                cleaned_up: false,
            },
            state,
        )
    }
}

impl MockState {
    /// Queues a batch returned by one future `poll_events` call.
    pub fn push_batch(&mut self, events: Vec<Event>) {
        self.pending.push_back(events);
    }

    pub fn count(&self, call: &MockCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl Platform for MockPlatform {
    fn create_window(&mut self, config: &WindowConfig) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create_window {
            bail!("Failed to open display (mock)");
        }
        let geometry = config.geometry();
        state.calls.push(MockCall::CreateWindow(geometry));
        self.geometry = Some(geometry);
        Ok(())
    }

    fn create_graphics(&mut self) -> Result<()> {
        self.state.lock().unwrap().calls.push(MockCall::CreateGraphics);
        Ok(())
    }

    fn show_window(&mut self) -> Result<()> {
        if self.geometry.is_none() {
            bail!("show_window called before create_window");
        }
        self.state.lock().unwrap().calls.push(MockCall::ShowWindow);
        Ok(())
    }

    fn poll_events(&mut self) -> Result<Vec<Event>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(MockCall::Poll);
        if let Some(geometry) = state.resize_on_next_poll.take() {
            self.geometry = Some(geometry);
        }
        if state.fail_next_poll {
            state.fail_next_poll = false;
            bail!("mock poll failure");
        }
        Ok(state.pending.pop_front().unwrap_or_default())
    }

    fn geometry(&self) -> Option<WindowGeometry> {
        self.geometry
    }

    fn cleanup(&mut self) -> Result<()> {
        if !self.cleaned_up {
            self.cleaned_up = true;
            self.geometry = None;
            self.state.lock().unwrap().calls.push(MockCall::Cleanup);
        }
        Ok(())
    }
}
