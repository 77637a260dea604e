//! Clap derive structures for the `unifi-leds` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// unifi-leds -- UniFi LED indicators as smart-home switches
#[derive(Debug, Parser)]
#[command(
    name = "unifi-leds",
    version,
    about = "Control UniFi access point and gateway LEDs",
    long_about = "Discovers LED-capable UniFi devices across controller sites and keeps\n\
        them registered as on/off switch accessories.\n\n\
        Works with UniFi OS consoles and classic Network Application controllers;\n\
        the controller dialect is detected at login.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "UNIFI_LEDS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LedState {
    On,
    Off,
}

impl LedState {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the platform: discover, keep accessories in sync, refresh periodically
    Run,

    /// Run a single discovery cycle and print what changed
    Discover,

    /// List LED-capable devices that pass the include/exclude rules
    Devices,

    /// Show one device by MAC address
    Device {
        /// MAC address (any case)
        mac: String,
    },

    /// Switch a device LED on or off
    Set {
        /// Controller device id (`_id`)
        id: String,
        state: LedState,
    },

    /// Print the effective configuration (password redacted)
    Config,
}
