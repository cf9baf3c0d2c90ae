//! `snapback-loopd`: the companion Launch Loop that serializes backup
//! invocations triggered by files dropped into a watch directory
//! (spec.md §4.8).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use snapback::cli::LoopdCli;
use snapback::command::{CommandRunner, SystemCommandRunner};
use snapback::config::{self, ConfigTree};
use snapback::error::Result;
use snapback::launch_loop::{self, LoopConfig};
use snapback::logging::init_logging;
use snapback::mail::{MailSender, NullMailSender, SendmailMailSender};

const DEFAULT_LOOP_DELAY_SECS: u64 = 2;

fn main() {
    let cli = LoopdCli::parse();

    let tree = match ConfigTree::load_default(cli.config.as_deref(), None) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("snapback-loopd: {e}");
            std::process::exit(1);
        }
    };

    let verbosity = if cli.debug { cli.verbose.max(1) } else { cli.verbose };
    let debug_file = tree
        .scope(None, None)
        .get_string("debugfile")
        .map(PathBuf::from);
    if let Err(e) = init_logging(verbosity, cli.quiet, None, cli.debug, debug_file.as_deref()) {
        eprintln!("failed to initialize logging: {e}");
    }

    if let Err(e) = run(&cli, tree) {
        eprintln!("snapback-loopd: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &LoopdCli, tree: ConfigTree) -> Result<()> {
    let global = tree.scope(None, None);

    let loop_dir = PathBuf::from(global.get_string("loopdirectory").unwrap_or("/tmp/backups"));
    // `LoopDelay` is validated and logged but, per spec.md §4.8, never
    // drives the actual poll cadence: the loop always sleeps
    // `DEFAULT_LOOP_DELAY_SECS` between passes.
    if let Some(v) = global.get_string("loopdelay") {
        if let Err(e) = config::parse_duration_seconds(v) {
            tracing::warn!(error = %e, value = v, "ignoring malformed LoopDelay");
        }
    }
    let admin_email = global.get_string("adminemail").map(str::to_string);

    let mut engine_args = Vec::new();
    if let Some(config_path) = &cli.config {
        engine_args.push("-c".to_string());
        engine_args.push(config_path.display().to_string());
    }
    if cli.debug {
        engine_args.push("-d".to_string());
    }

    let loop_cfg = LoopConfig {
        loop_dir,
        engine_binary: resolve_engine_binary(),
        engine_args,
        admin_email,
    };

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
    let mailer: Box<dyn MailSender> = match global.get_string("sendmail") {
        Some(cmd) => Box::new(SendmailMailSender::new(runner.clone(), cmd)),
        None => Box::new(NullMailSender),
    };

    tracing::info!(
        loop_dir = %loop_cfg.loop_dir.display(),
        loop_delay = DEFAULT_LOOP_DELAY_SECS,
        "snapback-loopd starting"
    );

    loop {
        match launch_loop::poll_once(&loop_cfg, runner.as_ref(), mailer.as_ref()) {
            Ok(0) => {}
            Ok(n) => tracing::debug!(processed = n, "poll pass processed triggers"),
            Err(e) => tracing::error!(error = %e, "poll pass failed"),
        }
        std::thread::sleep(Duration::from_secs(DEFAULT_LOOP_DELAY_SECS));
    }
}

/// The `snapback` engine binary lives alongside `snapback-loopd` when
/// installed normally; fall back to a bare `snapback` resolved via
/// `PATH` if the sibling isn't found (e.g. during development).
fn resolve_engine_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join("snapback");
            if candidate.exists() {
                return candidate;
            }
        }
    }
    PathBuf::from("snapback")
}
