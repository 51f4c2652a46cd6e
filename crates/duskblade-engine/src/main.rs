//! # Duskblade Engine
//!
//! Headless entry point for Duskblade.
//!
//! Loads `duskblade.toml` (or the path given as an argument), builds a
//! session from the configured level and runs it at a fixed step. `--mute`
//! discards all sounds for this run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod config;

use anyhow::Result;
use config::{EngineConfig, CONFIG_FILE};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Command line options.
#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    config_path: String,
    mute: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut parsed = Self {
            config_path: CONFIG_FILE.to_string(),
            mute: false,
        };
        for arg in args {
            if arg == "--mute" {
                parsed.mute = true;
            } else {
                parsed.config_path = arg;
            }
        }
        parsed
    }
}

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("duskblade=info".parse()?))
        .init();

    info!("Duskblade starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = CliArgs::parse(std::env::args().skip(1));
    let mut config = EngineConfig::load_from(&args.config_path);
    if !Path::new(&args.config_path).exists() {
        if let Err(e) = config.save_to(&args.config_path) {
            warn!("Failed to write default config: {e}");
        }
    }
    config.mute |= args.mute;

    let summary = app::run(&config)?;
    for (sound, count) in &summary.sounds {
        info!("  {sound}: {count}");
    }

    info!("Duskblade shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse(args.iter().map(|a| (*a).to_string()))
    }

    #[test]
    fn test_default_args() {
        assert_eq!(
            parse(&[]),
            CliArgs {
                config_path: CONFIG_FILE.to_string(),
                mute: false,
            }
        );
    }

    #[test]
    fn test_mute_flag_and_path() {
        let args = parse(&["--mute", "custom.toml"]);
        assert!(args.mute);
        assert_eq!(args.config_path, "custom.toml");
        assert!(!parse(&["custom.toml"]).mute);
    }
}
