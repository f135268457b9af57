// src/main.rs

use rapture_pixel_engine::{Engine, KeySymbol, CONFIG};

use log::{error, info};

/// Opens the window, logs key events and exits on Escape or window close.
fn main() {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting rapture...");

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
    info!("rapture exited successfully.");
}

fn run() -> anyhow::Result<()> {
    info!("Window config: {:?}", CONFIG.window);
    let engine = Engine::instance()?;

    let stop = engine.stop_handle();
    engine.on_key_press(move |key| {
        info!(
            "Key pressed: {:?} (keycode {}, modifiers {:?}, text {:?})",
            key.symbol, key.keycode, key.modifiers, key.text
        );
        if key.symbol == KeySymbol::Escape {
            stop.request_stop();
        }
    });
    engine.on_key_release(|key| {
        info!("Key released: {:?} (keycode {})", key.symbol, key.keycode);
    });
    engine.on_close_requested(|| info!("Window closed by the window manager."));

    if engine.config().engine.threaded {
        engine.start()?;
        engine.wait()
    } else {
        engine.run()
    }
}
