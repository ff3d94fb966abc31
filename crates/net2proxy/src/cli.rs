//! Clap derive structures for the `net2proxy` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use net2_core::{Activity, UserGroup};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// net2proxy -- mirror Net2 access-control servers
#[derive(Debug, Parser)]
#[command(
    name = "net2proxy",
    version,
    about = "Mirror Net2 access-control servers and relay door commands",
    long_about = "Keeps an in-memory copy of users, doors, departments and access levels\n\
        for every Net2 server in the config file, refreshed on a timer.\n\n\
        One-shot commands load the same file, talk to a single site and exit.",
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
    /// Path to the YAML config file
    #[arg(
        long,
        short = 'c',
        env = "NET2_CONFIG",
        default_value = net2_config::DEFAULT_CONFIG_PATH,
        global = true
    )]
    pub config: PathBuf,

    /// Output format
    #[arg(long, short = 'o', value_enum, default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Log line format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start every site and keep the caches fresh until interrupted
    Run,

    /// Validate the config file and list the configured sites
    Check,

    /// Refresh every site once and report what was fetched
    Sync(SyncArgs),

    /// Door commands
    #[command(subcommand)]
    Door(DoorCommand),

    /// User listing and commands
    #[command(subcommand)]
    Users(UsersCommand),
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Only refresh this site
    #[arg(long)]
    pub site: Option<i64>,
}

/// Selects a site by its configured ID.
#[derive(Debug, Args)]
pub struct SiteArg {
    /// Site ID from the config file
    #[arg(long, short = 's')]
    pub site: i64,
}

#[derive(Debug, Subcommand)]
pub enum DoorCommand {
    /// List the doors of a site
    List {
        #[command(flatten)]
        site: SiteArg,

        /// Only the monitored doors, in config order
        #[arg(long)]
        monitored: bool,
    },

    /// Open a door
    Open {
        #[command(flatten)]
        site: SiteArg,

        /// Door ID
        #[arg(long, short = 'd')]
        door: i64,

        /// Fire a timed open on a specific relay instead
        #[arg(long, value_enum)]
        relay: Option<RelayArg>,
    },

    /// Close a door
    Close {
        #[command(flatten)]
        site: SiteArg,

        /// Door ID
        #[arg(long, short = 'd')]
        door: i64,
    },

    /// Run a named openable-door sequence and wait for it to finish
    Sequence {
        #[command(flatten)]
        site: SiteArg,

        /// Name of the openable door in the config file
        #[arg(long, short = 'n')]
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RelayArg {
    Relay1,
    Relay2,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List users, optionally filtered by department group
    List {
        #[command(flatten)]
        site: SiteArg,

        /// all, staff, visitors, contractors, cleaners, customers, cancelled, non-staff
        #[arg(long, short = 'g', default_value = "all")]
        group: UserGroup,

        /// any, active, active-today
        #[arg(long, short = 'a', default_value = "any")]
        activity: Activity,
    },

    /// Extend a user's expiry to the end of tomorrow
    Activate {
        #[command(flatten)]
        site: SiteArg,

        /// User ID
        #[arg(long, short = 'u')]
        user: i64,
    },

    /// Expire a user at the end of yesterday
    Deactivate {
        #[command(flatten)]
        site: SiteArg,

        /// User ID
        #[arg(long, short = 'u')]
        user: i64,
    },

    /// Clear a user's anti-passback state
    ResetAntiPassback {
        #[command(flatten)]
        site: SiteArg,

        /// User ID
        #[arg(long, short = 'u')]
        user: i64,
    },
}
