mod core;
mod ewmh;
mod input;
mod window;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use tilewm_config::{WmConfig, WORKSPACE_COUNT};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::core::context::X11Context;
use crate::core::spawn::Launcher;
use crate::window::error::ErrorTracker;
use crate::window::manager::WindowManager;

/// A minimal tiling window manager for X11.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let _args = Args::parse();

    info!("Starting {}...", ewmh::setup::WM_NAME);

    let config = WmConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        WmConfig::default()
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))?;
    }
    let launcher = Launcher::new(config.reap_policy)?;

    let errors = Arc::new(ErrorTracker::new());
    let ctx = match X11Context::new(Arc::clone(&errors)) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Failed to start: {:#}", e);
            return Err(e);
        }
    };
    info!("Successfully connected to X11 server.");
    info!(
        "Screen: {}, Root Window: {}, {}x{}",
        ctx.screen_num, ctx.root_window, ctx.screen_width, ctx.screen_height
    );

    let check_win = ewmh::setup::setup_hints(&ctx, u32::from(WORKSPACE_COUNT))?;

    let mut wm = WindowManager::new(ctx, config, launcher, errors, shutdown);
    wm.grab_bindings();
    wm.scan_windows();

    let result = wm.run();
    if let Err(e) = &result {
        error!("Event loop failed: {:#}", e);
    }

    let summary = wm.errors.summary();
    info!(
        "Shutting down ({} protocol errors, {} request errors, {} window errors)",
        summary.protocol_errors, summary.request_errors, summary.window_errors
    );
    if let Err(e) = ewmh::setup::teardown_hints(&wm.display, check_win) {
        warn!("Failed to remove EWMH hints: {}", e);
    }

    result
}
