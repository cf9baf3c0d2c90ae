//! CLI definitions for both binaries (spec.md §6).

use std::path::PathBuf;

use clap::Parser;

/// Rolling, hard-link deduplicated snapshot backups over rsync.
#[derive(Parser, Debug)]
#[command(name = "snapback", author, version, about, long_about = None)]
pub struct EngineCli {
    /// Configuration file (overrides the default search order).
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Enable debug output.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Force a run regardless of the schedule gate.
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Restrict to `Backup` blocks whose host name matches this regex.
    #[arg(short = 'p', long = "host-pattern")]
    pub host_pattern: Option<String>,

    /// Restrict to directories whose path matches this regex.
    #[arg(short = 'P', long = "dir-pattern")]
    pub dir_pattern: Option<String>,

    /// Alternate run log path (used by `snapback-loopd` launches).
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only).
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Named config shortcut, resolved to `/etc/snapback/NAME.conf`.
    pub name: Option<String>,
}

/// Companion launch loop: serializes backup invocations triggered by a
/// trigger-file drop-box.
#[derive(Parser, Debug)]
#[command(name = "snapback-loopd", author, version, about, long_about = None)]
pub struct LoopdCli {
    /// Configuration file (overrides the default search order).
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Enable debug output.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Increase logging verbosity (-v, -vv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only).
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,
}
