//! Snapshot Engine: the orchestrator that, per (host, directory),
//! selects a destination, checks the schedule gate, rotates the hourly
//! ring, clones slot 0 to slot 1, invokes the external sync, and
//! promotes into the daily/weekly/monthly rings (spec.md §4.6).

pub mod calendar;
pub mod clone;
pub mod destination;
pub mod job;
pub mod ring;
pub mod schedule;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

pub use job::{BackupJob, DestinationPolicy, RetentionPolicy, Tier};

use crate::accounting::RunLog;
use crate::command::CommandRunner;
use crate::error::{Result, SnapbackError};
use crate::util::unix_seconds;

/// Everything the engine threads through a run instead of relying on
/// process-wide globals (spec.md §9, "Global mutable state"): the
/// active command runner, the `-f` force override, and the
/// accumulating run transcript/billing accumulator.
pub struct RunContext {
    pub runner: Arc<dyn CommandRunner>,
    pub force: bool,
    pub run_log: RunLog,
}

impl RunContext {
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, force: bool) -> Self {
        Self {
            runner,
            force,
            run_log: RunLog::new(),
        }
    }
}

/// Result of running a single job: either it wasn't due, or it ran to
/// completion. Job-fatal failures are returned as `Err` by `run_job`
/// and isolated by `run_all`, per spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Skipped,
    Completed,
}

/// Strip a leading path separator so an absolute remote directory like
/// `/home/mike` joins under a destination root as `dest/host/home/mike`
/// instead of replacing it outright (`Path::join` treats an absolute
/// operand as a full replacement).
fn relative_path(dir: &str) -> PathBuf {
    PathBuf::from(dir.trim_start_matches(['/', '\\']))
}

fn ensure_prefix(prefix: &Path, create_dir: bool, host: &str, directory: &str) -> Result<()> {
    match std::fs::metadata(prefix) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(SnapbackError::DestinationNotDirectory {
            path: prefix.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if create_dir {
                std::fs::create_dir_all(prefix).map_err(|e| SnapbackError::io(prefix, e))
            } else {
                Err(SnapbackError::JobFatal {
                    host: host.to_string(),
                    directory: directory.to_string(),
                    message: format!("destination {prefix:?} missing and CreateDir disabled"),
                })
            }
        }
        Err(e) => Err(SnapbackError::io(prefix, e)),
    }
}

/// Run a single resolved job to completion. See spec.md §4.6 for the
/// step-by-step contract.
///
/// # Errors
///
/// Returns a job-fatal error (missing/non-directory destination, a
/// failed rotate/clone, or a non-zero sync exit). Callers isolate
/// failures per job; see `run_all`.
pub fn run_job(ctx: &mut RunContext, job: &BackupJob) -> Result<JobOutcome> {
    let dest_root = destination::select(
        &job.host,
        &job.remote_directory,
        &job.hourly_dir,
        &job.destination,
    )?;
    let prefix = dest_root
        .join(&job.host)
        .join(relative_path(&job.remote_directory));
    ensure_prefix(&prefix, job.create_dir, &job.host, &job.remote_directory)?;

    let hourly_base = prefix.join(&job.hourly_dir);
    let hourly0 = ring::slot_path(&hourly_base, 0);

    let slot0_secs = unix_seconds(destination::slot_mtime(&hourly0));
    let now_secs = unix_seconds(SystemTime::now());
    let flags = calendar::compute(slot0_secs, now_secs);

    if !schedule::is_due(
        job.retention.hourlies,
        slot0_secs,
        now_secs,
        job.must_exceed_seconds,
        ctx.force,
        job.auto_time,
    ) {
        return Ok(JobOutcome::Skipped);
    }

    let exclude_args: Vec<String> = job
        .excludes
        .iter()
        .map(|pattern| format!("--exclude={pattern}"))
        .collect();

    ring::rotate(
        ctx.runner.as_ref(),
        &job.rm_command,
        &job.mv_command,
        &hourly_base,
        job.retention.hourlies,
        false,
    )?;

    let hourly1 = ring::slot_path(&hourly_base, 1);
    if hourly0.exists() {
        clone::hard_link_clone(ctx.runner.as_ref(), &job.cp_command, &hourly0, &hourly1)?;
    }
    if !hourly0.exists() {
        std::fs::create_dir_all(&hourly0).map_err(|e| SnapbackError::io(&hourly0, e))?;
    }

    ctx.run_log.mark_client(&job.host);
    let mut args = job.rsync_opts.clone();
    args.extend(exclude_args);
    args.push(job.sync_source());
    args.push(hourly0.display().to_string());

    let output = ctx.runner.run(&job.rsync, &args, None)?;
    ctx.run_log.ingest(&output.stdout);
    ctx.run_log.ingest(&output.stderr);
    if !output.success() {
        return Err(SnapbackError::CommandFailed {
            program: job.rsync.clone(),
            status: output.status,
            stderr: output.stderr,
        });
    }

    filetime::set_file_mtime(&hourly0, filetime::FileTime::now())
        .map_err(|e| SnapbackError::io(&hourly0, e))?;

    for (due, count, tier_dir) in [
        (flags.do_dailies, job.retention.dailies, job.daily_dir.as_str()),
        (
            flags.do_weeklies,
            job.retention.weeklies,
            job.weekly_dir.as_str(),
        ),
        (
            flags.do_monthlies,
            job.retention.monthlies,
            job.monthly_dir.as_str(),
        ),
    ] {
        if due && count > 0 {
            let base = prefix.join(tier_dir);
            ring::rotate(
                ctx.runner.as_ref(),
                &job.rm_command,
                &job.mv_command,
                &base,
                count,
                true,
            )?;
            if hourly0.exists() {
                let slot0 = ring::slot_path(&base, 0);
                clone::hard_link_clone(ctx.runner.as_ref(), &job.cp_command, &hourly0, &slot0)?;
                if !slot0.exists() {
                    std::fs::create_dir_all(&slot0).map_err(|e| SnapbackError::io(&slot0, e))?;
                }
            }
        }
    }

    Ok(JobOutcome::Completed)
}

/// Run every job in declaration order, strictly sequentially. A
/// job-fatal failure is recorded in the run transcript and does not
/// stop the remaining jobs (spec.md §5, §7).
pub fn run_all(ctx: &mut RunContext, jobs: &[BackupJob]) {
    for job in jobs {
        if let Err(e) = run_job(ctx, job) {
            ctx.run_log.log_error(format!(
                "host {} directory {}: {e}",
                job.host, job.remote_directory
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockCommandRunner;
    use filetime::{FileTime, set_file_mtime};
    use tempfile::tempdir;

    fn job(dest: PathBuf) -> BackupJob {
        BackupJob {
            host: "h1".to_string(),
            remote_directory: "/home/mike".to_string(),
            excludes: vec!["*.tmp".to_string()],
            retention: RetentionPolicy {
                hourlies: 4,
                dailies: 7,
                weeklies: 4,
                monthlies: 0,
            },
            destination: DestinationPolicy::Fixed(dest),
            auto_time: false,
            literal_directory: false,
            create_dir: true,
            hourly_dir: "hourly".to_string(),
            daily_dir: "daily".to_string(),
            weekly_dir: "weekly".to_string(),
            monthly_dir: "monthly".to_string(),
            must_exceed_seconds: 300,
            rsync: "rsync".to_string(),
            rsync_opts: vec!["-avz".to_string()],
            cp_command: vec!["cp".to_string(), "-al".to_string()],
            mv_command: vec!["mv".to_string()],
            rm_command: vec!["rm".to_string(), "-rf".to_string()],
        }
    }

    #[test]
    fn cold_start_creates_hourly_and_daily() {
        let tmp = tempdir().unwrap();
        let runner = Arc::new(MockCommandRunner::new());
        runner.push_success("wrote 100 bytes read 4096 bytes  1234.56 bytes/sec");
        let mut ctx = RunContext::new(runner.clone(), false);

        let outcome = run_job(&mut ctx, &job(tmp.path().to_path_buf())).unwrap();
        assert_eq!(outcome, JobOutcome::Completed);

        let prefix = tmp.path().join("h1").join("home/mike");
        assert!(prefix.join("hourly.0").is_dir());
        assert!(prefix.join("daily.0").is_dir());
        assert_eq!(*ctx.run_log.charges().get("h1").unwrap(), 4096);
    }

    #[test]
    fn gate_skip_does_not_touch_filesystem() {
        let tmp = tempdir().unwrap();
        let prefix = tmp.path().join("h1").join("home/mike");
        let hourly0 = prefix.join("hourly.0");
        std::fs::create_dir_all(&hourly0).unwrap();
        set_file_mtime(&hourly0, FileTime::now()).unwrap();

        let runner = Arc::new(MockCommandRunner::new());
        let mut ctx = RunContext::new(runner, false);
        let mut j = job(tmp.path().to_path_buf());
        j.auto_time = true;
        j.must_exceed_seconds = 3600;

        let outcome = run_job(&mut ctx, &j).unwrap();
        assert_eq!(outcome, JobOutcome::Skipped);
        assert!(!prefix.join("hourly.1").exists());
    }

    #[test]
    fn sync_failure_is_job_fatal_and_isolated_by_run_all() {
        let tmp = tempdir().unwrap();
        let runner = Arc::new(MockCommandRunner::new());
        runner.push_failure(23, "rsync error: some files could not be transferred");
        let mut ctx = RunContext::new(runner, false);

        let jobs = vec![job(tmp.path().to_path_buf())];
        run_all(&mut ctx, &jobs);
        assert!(ctx.run_log.errors_logged());
    }

    #[test]
    fn destination_not_a_directory_is_job_fatal() {
        let tmp = tempdir().unwrap();
        let mut j = job(tmp.path().to_path_buf());
        j.remote_directory = "nodir".to_string();

        let prefix = tmp.path().join("h1").join("nodir");
        std::fs::create_dir_all(prefix.parent().unwrap()).unwrap();
        std::fs::write(&prefix, "a plain file, not a directory").unwrap();

        let runner = Arc::new(MockCommandRunner::new());
        let mut ctx = RunContext::new(runner, false);
        let err = run_job(&mut ctx, &j).unwrap_err();
        assert!(matches!(err, SnapbackError::DestinationNotDirectory { .. }));
    }
}
