//! Bambu Beacon - Main Entry Point
//!
//! Usage: `bambu-beacon [SETTINGS.toml]`

use anyhow::Context;
use bambu_beacon::app::application::run_app;
use bambu_beacon::app::logging::init_logging;
use bambu_beacon::connection::{FileSettings, SettingsSource};

fn main() -> anyhow::Result<()> {
    let source = match std::env::args_os().nth(1) {
        Some(path) => FileSettings::new(path),
        None => FileSettings::default_location().context("Failed to resolve settings path")?,
    };

    // Logging options live in the settings file, so read it once up front.
    let settings = source
        .load()
        .with_context(|| format!("Failed to load {}", source.path().display()))?;
    let _guard = init_logging(&settings.logging).context("Failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        settings = %source.path().display(),
        "Starting Bambu Beacon..."
    );

    run_app(source)?;
    Ok(())
}
