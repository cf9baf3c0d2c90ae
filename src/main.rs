//! `snapback`: runs one pass of the Snapshot Engine over every
//! configured (host, directory) job (spec.md §4.6, §6).

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use regex::Regex;

use snapback::accounting;
use snapback::cli::EngineCli;
use snapback::command::{CommandRunner, SystemCommandRunner};
use snapback::config::ConfigTree;
use snapback::engine::{self, BackupJob, RunContext};
use snapback::error::{Result, SnapbackError};
use snapback::logging::init_logging;
use snapback::mail::{MailSender, NullMailSender, SendmailMailSender};
use snapback::util::resolve_my_host;

fn main() {
    let cli = EngineCli::parse();

    let tree = match ConfigTree::load_default(cli.config.as_deref(), cli.name.as_deref()) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("snapback: {e}");
            std::process::exit(1);
        }
    };

    let verbosity = if cli.debug { cli.verbose.max(1) } else { cli.verbose };
    let debug_file = tree
        .scope(None, None)
        .get_string("debugfile")
        .map(PathBuf::from);
    if let Err(e) = init_logging(
        verbosity,
        cli.quiet,
        cli.log_file.as_deref(),
        cli.debug,
        debug_file.as_deref(),
    ) {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(&cli, tree) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("snapback: {e}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &EngineCli, tree: ConfigTree) -> Result<()> {
    let global = tree.scope(None, None);

    let host_filter = compile_regex(cli.host_pattern.as_deref())?;
    let dir_filter = compile_regex(cli.dir_pattern.as_deref())?;

    let jobs = BackupJob::resolve_all(&tree, host_filter.as_ref(), dir_filter.as_ref())?;

    let runner: Arc<dyn CommandRunner> = Arc::new(SystemCommandRunner);
    let mut ctx = RunContext::new(runner.clone(), cli.force);

    engine::run_all(&mut ctx, &jobs);

    let my_host = resolve_my_host(global.get_string("myhost"));
    tracing::info!(host = %my_host, jobs = jobs.len(), "run complete");

    if cli.debug {
        match serde_json::to_string(&ctx.run_log.summary()) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize run summary"),
        }
    }

    let today = Local::now().date_naive();
    if let Some(charge_file) = global.get_string("chargefile") {
        accounting::append_charges(&PathBuf::from(charge_file), ctx.run_log.charges(), today)?;
    }

    let log_file = PathBuf::from(global.get_string("logfile").unwrap_or("/var/log/snapback"));
    if ctx.run_log.errors_logged() {
        accounting::append_error_log(&log_file, &ctx.run_log.transcript())?;
    }

    let always_email = global.get_bool("alwaysemail", false);
    if accounting::should_email(always_email, ctx.run_log.errors_logged()) {
        if let Some(admin) = global.get_string("adminemail") {
            let mailer: Box<dyn MailSender> = match global.get_string("sendmail") {
                Some(cmd) => Box::new(SendmailMailSender::new(runner.clone(), cmd)),
                None => Box::new(NullMailSender),
            };
            if let Err(e) = mailer.send(admin, "snapback run log", &ctx.run_log.transcript()) {
                tracing::warn!(error = %e, "failed to send run-log email");
            }
        }
    }

    Ok(())
}

fn compile_regex(pattern: Option<&str>) -> Result<Option<Regex>> {
    match pattern {
        Some(p) => Regex::new(p)
            .map(Some)
            .map_err(|source| SnapbackError::InvalidRegex {
                pattern: p.to_string(),
                source,
            }),
        None => Ok(None),
    }
}
