//! config-builder - A terminal form for building JSON configurations
//!
//! Fields come from `config/config_fields.json`; the result is saved under
//! `save_config/`. Uses the Component Architecture pattern from ratatui.

mod action;
mod app;
mod component;
mod components;
mod config;
mod errors;
mod model;
mod services;
mod tui;

use crate::action::Action;
use crate::app::App;
use crate::component::Component;
use crate::config::{Paths, Settings};
use crate::services::logging::init_tracing;
use crate::tui::Tui;
use anyhow::Result;
use crossterm::event::Event;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    let paths = Paths::resolve();
    let (settings, settings_error) = match Settings::load(&paths) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    // Nothing may reach stdout once the terminal is in raw mode
    if let Err(e) = init_tracing(&paths.log_dir(), &settings.log_level) {
        eprintln!("Logging disabled: {}", e);
    }
    info!(
        "starting {} v{} in {}",
        settings.app_name,
        env!("CARGO_PKG_VERSION"),
        paths.root().display()
    );
    if let Some(e) = settings_error {
        warn!("settings.json ignored: {}", e);
    }

    let tick_rate = Duration::from_millis(settings.tick_rate_ms.max(10));
    let mut tui = Tui::new()?.with_tick_rate(tick_rate);
    tui.enter()?;

    let result = App::new(paths, settings).and_then(|mut app| run_app(&mut tui, &mut app));

    tui.exit()?;

    if let Err(err) = result {
        error!("fatal: {:?}", err);
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }

    info!("bye");
    Ok(())
}

/// Run the main application loop
fn run_app(tui: &mut Tui, app: &mut App) -> Result<()> {
    while !app.should_quit {
        tui.draw(|frame| {
            if let Err(e) = app.draw(frame, frame.area()) {
                error!("draw error: {}", e);
            }
        })?;

        if let Some(event) = tui.next_event()? {
            let action = match event {
                Event::Key(key) => app.handle_key_event(key)?,
                Event::Resize(w, h) => Some(Action::Resize(w, h)),
                _ => None,
            };

            // Action might produce a follow-up action
            let mut current_action = action;
            while let Some(a) = current_action {
                current_action = app.update(a)?;
            }
        } else {
            let mut current_action = Some(Action::Tick);
            while let Some(a) = current_action {
                current_action = app.update(a)?;
            }
        }
    }

    Ok(())
}
