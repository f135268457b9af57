// src/engine/mod.rs

//! The engine: one window, one optional background thread, and the
//! callbacks input events are forwarded to.
//!
//! # Lifecycle
//!
//! Construction creates the window, the (stub) graphics context, and shows
//! the window. In threaded mode it also spawns the engine thread, which
//! blocks until [`Engine::start`] flips the run state from `Idle` to
//! `Running`:
//!
//! ```text
//!   Idle ──start()──▶ Running ──request_stop() / CloseRequested──▶ Stopping ──stop()/wait()──▶ Stopped
//!     └──────────────────────request_stop()───────────────────────────▲
//! ```
//!
//! The platform object is owned by exactly one thread at a time. It moves
//! into the engine thread at spawn and comes back through the join handle,
//! after which `stop`/`wait` clean it up.

use crate::config::{Config, WindowGeometry, CONFIG};
use crate::event::{Event, EventKind, KeyEvent};
use crate::platform::x11::X11Platform;
use crate::platform::Platform;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, error, info, warn};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;


/// Name given to the background polling thread.
pub const ENGINE_THREAD_NAME: &str = "rapture-engine";

static ENGINE: OnceCell<Engine> = OnceCell::new();

type BoxedPlatform = Box<dyn Platform>;
type Callback = Arc<dyn Fn(&Event) + Send + Sync + 'static>;
type EngineThread = JoinHandle<(BoxedPlatform, Result<()>)>;

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Window is up; the engine thread (if any) waits for `start`.
    Idle,
    /// The poll loop is dispatching events.
    Running,
    /// A stop was requested; the poll loop exits at its next check.
    Stopping,
    /// The loop has ended and the platform was cleaned up.
    Stopped,
}

/// State shared between the engine and its thread.
struct Shared {
    state: Mutex<RunState>,
    signal: Condvar,
    handlers: RwLock<Vec<(EventKind, Callback)>>,
    geometry: Mutex<WindowGeometry>,
    /// Thread running the poll loop, once it has entered it.
    loop_thread: Mutex<Option<ThreadId>>,
}

impl Shared {
    fn new(geometry: WindowGeometry) -> Self {
        Self {
            state: Mutex::new(RunState::Idle),
            signal: Condvar::new(),
            handlers: RwLock::new(Vec::new()),
            geometry: Mutex::new(geometry),
            loop_thread: Mutex::new(None),
        }
    }

    // Poisoning is ignored: callbacks never run under this lock.
    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, new_state: RunState) {
        *self.lock_state() = new_state;
        self.signal.notify_all();
    }

    fn request_stop(&self) {
        let mut state = self.lock_state();
        if matches!(*state, RunState::Idle | RunState::Running) {
            debug!("Stop requested (was {:?}).", *state);
            *state = RunState::Stopping;
            self.signal.notify_all();
        }
    }

    /// Blocks until the state leaves `Idle`. Returns whether the engine
    /// should start polling.
    fn wait_for_start(&self) -> bool {
        let mut state = self.lock_state();
        while *state == RunState::Idle {
            state = self
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *state == RunState::Running
    }

    /// Blocks until whoever owns the teardown has finished it.
    fn wait_until_stopped(&self) {
        let state = self.lock_state();
        drop(
            self.signal
                .wait_while(state, |s| *s != RunState::Stopped)
                .unwrap_or_else(PoisonError::into_inner),
        );
    }

    fn geometry(&self) -> WindowGeometry {
        *self.geometry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_geometry(&self, geometry: WindowGeometry) {
        let mut current = self.geometry.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != geometry {
            debug!("Window geometry now {:?}.", geometry);
            *current = geometry;
        }
    }

    fn enter_loop(&self) {
        *self.loop_thread.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(thread::current().id());
    }

    fn on_loop_thread(&self) -> bool {
        *self.loop_thread.lock().unwrap_or_else(PoisonError::into_inner)
            == Some(thread::current().id())
    }

    /// Sleeps up to `interval` unless a stop request arrives first.
    fn pause(&self, interval: Duration) {
        let state = self.lock_state();
        if *state == RunState::Running {
            let _ = self
                .signal
                .wait_timeout_while(state, interval, |s| *s == RunState::Running)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn dispatch(&self, event: &Event) {
        let kind = event.kind();
        // Callbacks run outside the lock so they may register more callbacks.
        let matching: Vec<Callback> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in matching {
            callback(event);
        }
    }
}

/// Polls `platform` and dispatches events until the state leaves `Running`.
fn run_event_loop(shared: &Shared, platform: &mut dyn Platform, interval: Duration) -> Result<()> {
    info!("Engine event loop started.");
    shared.enter_loop();
    while *shared.lock_state() == RunState::Running {
        let events = match platform.poll_events() {
            Ok(events) => events,
            Err(e) => {
                error!("Polling the platform failed: {:#}", e);
                shared.request_stop();
                return Err(e.context("Engine event loop aborted"));
            }
        };
        if let Some(geometry) = platform.geometry() {
            shared.set_geometry(geometry);
        }

        for event in &events {
            shared.dispatch(event);
            if *event == Event::CloseRequested {
                info!("Window close requested; stopping engine.");
                shared.request_stop();
            }
        }

        shared.pause(interval);
    }
    info!("Engine event loop finished.");
    Ok(())
}

/// Cloneable handle that asks the engine to stop without waiting for it.
///
/// Safe to use from callbacks running on the engine thread.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }
}

/// The windowing engine.
///
/// There is normally one per process, reached through [`Engine::instance`].
/// [`Engine::new`] builds a free-standing engine around any [`Platform`].
pub struct Engine {
    config: Config,
    shared: Arc<Shared>,
    /// Held here while no thread owns it (non-threaded mode before `run`).
    platform: Mutex<Option<BoxedPlatform>>,
    thread: Mutex<Option<EngineThread>>,
}

impl Engine {
    /// Returns the process-wide engine, creating it on first use with the
    /// X11 platform and the global [`CONFIG`].
    ///
    /// # Errors
    ///
    /// Fails if the X server cannot be reached or the window cannot be
    /// created. A later call retries.
    pub fn instance() -> Result<&'static Engine> {
        ENGINE.get_or_try_init(|| Engine::new(CONFIG.clone(), Box::new(X11Platform::new())))
    }

    /// The process-wide engine if it has been created.
    pub fn get() -> Option<&'static Engine> {
        ENGINE.get()
    }

    /// Creates the window, prepares graphics, shows the window and, in
    /// threaded mode, spawns the engine thread parked on the start signal.
    pub fn new(config: Config, mut platform: Box<dyn Platform>) -> Result<Self> {
        config.validate().context("Invalid engine configuration")?;

        if let Err(e) = Self::prepare_window(&config, platform.as_mut()) {
            if let Err(cleanup_err) = platform.cleanup() {
                warn!("Cleanup after failed window setup also failed: {:#}", cleanup_err);
            }
            return Err(e);
        }
        let geometry = platform
            .geometry()
            .unwrap_or_else(|| config.window.geometry());

        let shared = Arc::new(Shared::new(geometry));
        let (platform, thread) = if config.engine.threaded {
            let handle = Self::spawn_engine_thread(
                Arc::clone(&shared),
                platform,
                Duration::from_millis(config.engine.poll_interval_ms),
            )?;
            (None, Some(handle))
        } else {
            (Some(platform), None)
        };

        info!(
            "Engine created ({} mode), window {}x{} at ({}, {}).",
            if config.engine.threaded { "threaded" } else { "caller-driven" },
            geometry.width,
            geometry.height,
            geometry.x,
            geometry.y
        );
        Ok(Self {
            config,
            shared,
            platform: Mutex::new(platform),
            thread: Mutex::new(thread),
        })
    }

    fn prepare_window(config: &Config, platform: &mut dyn Platform) -> Result<()> {
        platform
            .create_window(&config.window)
            .context("Failed to create window")?;
        platform
            .create_graphics()
            .context("Failed to create graphics")?;
        platform.show_window().context("Failed to show window")?;
        Ok(())
    }

    fn spawn_engine_thread(
        shared: Arc<Shared>,
        mut platform: BoxedPlatform,
        interval: Duration,
    ) -> Result<EngineThread> {
        thread::Builder::new()
            .name(ENGINE_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("Engine thread waiting for start signal.");
                let result = if shared.wait_for_start() {
                    run_event_loop(&shared, platform.as_mut(), interval)
                } else {
                    info!("Engine stopped before it was started.");
                    Ok(())
                };
                (platform, result)
            })
            .context("Failed to spawn engine thread")
    }

    /// Releases the engine thread into its poll loop.
    ///
    /// Calling `start` on a running engine does nothing.
    ///
    /// # Errors
    ///
    /// Fails for a caller-driven engine (use [`Engine::run`]) and once the
    /// engine is stopping or stopped.
    pub fn start(&self) -> Result<()> {
        if !self.config.engine.threaded {
            bail!("Engine has no thread to start; call run() instead");
        }
        let mut state = self.shared.lock_state();
        match *state {
            RunState::Idle => {
                *state = RunState::Running;
                self.shared.signal.notify_all();
                info!("Engine started.");
                Ok(())
            }
            RunState::Running => {
                debug!("start() called on a running engine.");
                Ok(())
            }
            RunState::Stopping | RunState::Stopped => {
                bail!("Engine has been stopped and cannot be restarted")
            }
        }
    }

    /// Runs the poll loop on the calling thread until a stop is requested
    /// or the window is closed, then cleans up the platform.
    ///
    /// # Errors
    ///
    /// Fails in threaded mode, when called twice, or when polling fails.
    pub fn run(&self) -> Result<()> {
        if self.config.engine.threaded {
            bail!("Engine runs on its own thread; call start() instead");
        }
        let mut platform = self
            .lock_platform()
            .take()
            .ok_or_else(|| anyhow!("Engine is already running or has been stopped"))?;
        {
            let mut state = self.shared.lock_state();
            if *state != RunState::Idle {
                let current = *state;
                drop(state);
                *self.lock_platform() = Some(platform);
                bail!("Engine cannot run from state {:?}", current);
            }
            *state = RunState::Running;
        }
        info!("Engine running on the calling thread.");

        let loop_result = run_event_loop(
            &self.shared,
            platform.as_mut(),
            Duration::from_millis(self.config.engine.poll_interval_ms),
        );
        self.teardown(platform, loop_result)
    }

    /// Asks the poll loop to exit without waiting for it.
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }

    /// A handle callbacks can capture to stop the engine.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stops the engine, joins its thread and cleans up the platform.
    ///
    /// Idempotent. Returns the error that ended the poll loop, if any.
    /// From a callback on the polling thread this only requests the stop.
    /// When several threads stop concurrently, one performs the teardown and
    /// reports its result; the others block until the engine is `Stopped`
    /// and return `Ok`.
    pub fn stop(&self) -> Result<()> {
        self.shared.request_stop();
        self.finish()
    }

    /// Blocks until the engine thread ends on its own (window closed or a
    /// stop requested elsewhere), then cleans up like [`Engine::stop`].
    /// Never returns for an engine that is neither started nor stopped.
    pub fn wait(&self) -> Result<()> {
        if !self.config.engine.threaded {
            bail!("Engine has no thread to wait for");
        }
        self.finish()
    }

    fn finish(&self) -> Result<()> {
        if self.shared.on_loop_thread() {
            // Called from a callback: the loop exits on its own and whoever
            // joins it (or `run`) tears down.
            return Ok(());
        }

        let handle = self.lock_thread().take();
        if let Some(handle) = handle {
            return match handle.join() {
                Ok((platform, loop_result)) => self.teardown(platform, loop_result),
                Err(_) => {
                    self.shared.set_state(RunState::Stopped);
                    Err(anyhow!("Engine thread panicked"))
                }
            };
        }

        let platform = self.lock_platform().take();
        match platform {
            Some(platform) => self.teardown(platform, Ok(())),
            // Another thread (a concurrent `stop`/`wait`, or `run`) owns the
            // teardown.
            None => {
                self.shared.wait_until_stopped();
                Ok(())
            }
        }
    }

    fn teardown(&self, mut platform: BoxedPlatform, loop_result: Result<()>) -> Result<()> {
        let cleanup_result = platform.cleanup().context("Failed to clean up platform");
        self.shared.set_state(RunState::Stopped);
        info!("Engine stopped.");
        loop_result.and(cleanup_result)
    }

    fn lock_platform(&self) -> MutexGuard<'_, Option<BoxedPlatform>> {
        self.platform.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_thread(&self) -> MutexGuard<'_, Option<EngineThread>> {
        self.thread.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RunState {
        *self.shared.lock_state()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Window geometry as last reported by the platform, refreshed after
    /// every poll.
    pub fn geometry(&self) -> WindowGeometry {
        self.shared.geometry()
    }

    /// Registers `callback` for every event of `kind`.
    ///
    /// Callbacks run on the polling thread in registration order and may be
    /// added at any time, including from inside another callback.
    pub fn on<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.shared
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, Arc::new(callback)));
        debug!("Registered callback for {:?}.", kind);
    }

    pub fn on_key_press<F>(&self, callback: F)
    where
        F: Fn(&KeyEvent) + Send + Sync + 'static,
    {
        self.on(EventKind::KeyPress, move |event| {
            if let Some(key) = event.key() {
                callback(key);
            }
        });
    }

    pub fn on_key_release<F>(&self, callback: F)
    where
        F: Fn(&KeyEvent) + Send + Sync + 'static,
    {
        self.on(EventKind::KeyRelease, move |event| {
            if let Some(key) = event.key() {
                callback(key);
            }
        });
    }

    /// Runs `callback` when the window manager asks to close the window.
    /// The engine stops after all callbacks ran.
    pub fn on_close_requested<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(EventKind::CloseRequested, move |_| callback());
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Engine shut down with error: {:#}", e);
        }
    }
}
