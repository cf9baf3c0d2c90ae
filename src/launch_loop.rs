//! Launch Loop: the companion driver that serializes backup
//! invocations, one at a time, triggered by files dropped into a watch
//! directory (spec.md §4.8).

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::command::CommandRunner;
use crate::error::{Result, SnapbackError};
use crate::mail::MailSender;
use crate::util::is_safe_trigger_name;

/// Everything the loop needs to locate its watch directory, the engine
/// binary to launch, and where to report spurious triggers.
pub struct LoopConfig {
    pub loop_dir: PathBuf,
    pub engine_binary: PathBuf,
    /// Extra arguments forwarded ahead of `-l <inprocess> <name>`, e.g.
    /// `-c FILE` or `-d` mirrored from the loop's own CLI.
    pub engine_args: Vec<String>,
    pub admin_email: Option<String>,
}

impl LoopConfig {
    #[must_use]
    pub fn done_dir(&self) -> PathBuf {
        self.loop_dir.join("done")
    }

    #[must_use]
    pub fn err_dir(&self) -> PathBuf {
        self.loop_dir.join("errors")
    }
}

/// Scan `cfg.loop_dir` once. Spurious trigger names are rejected and
/// reported without launching anything; valid ones are renamed to
/// `.inprocess` and run through to completion before the next entry is
/// considered, matching the single-poll-pass ordering of spec.md §5.
///
/// Returns the number of entries processed (spurious or launched).
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be read (not
/// found is treated as "nothing to do").
pub fn poll_once(
    cfg: &LoopConfig,
    runner: &dyn CommandRunner,
    mailer: &dyn MailSender,
) -> Result<usize> {
    let entries = match std::fs::read_dir(&cfg.loop_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(SnapbackError::io(&cfg.loop_dir, e)),
    };

    let mut processed = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".inprocess") || name.ends_with(".done") {
            continue;
        }
        let name = name.to_string();
        processed += 1;

        if is_safe_trigger_name(&name) {
            launch(cfg, runner, &path, &name)?;
        } else {
            handle_spurious(cfg, &path, &name, mailer)?;
        }
    }
    Ok(processed)
}

fn timestamp() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

fn handle_spurious(
    cfg: &LoopConfig,
    path: &Path,
    name: &str,
    mailer: &dyn MailSender,
) -> Result<()> {
    let err_dir = cfg.err_dir();
    std::fs::create_dir_all(&err_dir).map_err(|e| SnapbackError::io(&err_dir, e))?;
    let dest = err_dir.join(format!("{name}.{}", timestamp()));
    std::fs::write(&dest, format!("spurious trigger name rejected: {name:?}\n"))
        .map_err(|e| SnapbackError::io(&dest, e))?;

    if let Some(admin) = &cfg.admin_email {
        let _ = mailer.send(
            admin,
            "snapback: spurious trigger rejected",
            &format!("Trigger {name:?} contained disallowed characters and was discarded.\n"),
        );
    }

    std::fs::remove_file(path).map_err(|e| SnapbackError::io(path, e))?;
    Ok(())
}

fn launch(cfg: &LoopConfig, runner: &dyn CommandRunner, path: &Path, name: &str) -> Result<()> {
    let inprocess = path.with_file_name(format!("{name}.inprocess"));
    std::fs::rename(path, &inprocess).map_err(|e| SnapbackError::io(&inprocess, e))?;

    let mut args = cfg.engine_args.clone();
    args.push("-l".to_string());
    args.push(inprocess.display().to_string());
    args.push(name.to_string());

    let program = cfg.engine_binary.display().to_string();
    let output = runner.run(&program, &args, None)?;
    append_output(&inprocess, &output.stdout, &output.stderr);

    let stamp = timestamp();
    if output.success() {
        let date_dir = cfg.done_dir().join(Local::now().format("%Y%m%d").to_string());
        std::fs::create_dir_all(&date_dir).map_err(|e| SnapbackError::io(&date_dir, e))?;
        let dest = date_dir.join(format!("{name}.{stamp}"));
        std::fs::rename(&inprocess, &dest).map_err(|e| SnapbackError::io(&dest, e))?;
    } else {
        append_failure_banner(&inprocess, output.status, &program, &args);
        let err_dir = cfg.err_dir();
        std::fs::create_dir_all(&err_dir).map_err(|e| SnapbackError::io(&err_dir, e))?;
        let dest = err_dir.join(format!("{name}.{stamp}"));
        std::fs::rename(&inprocess, &dest).map_err(|e| SnapbackError::io(&dest, e))?;
    }
    Ok(())
}

fn append_output(inprocess: &Path, stdout: &str, stderr: &str) {
    if let Ok(mut f) = std::fs::OpenOptions::new().append(true).open(inprocess) {
        let _ = writeln!(f, "{stdout}");
        let _ = writeln!(f, "{stderr}");
    }
}

fn append_failure_banner(inprocess: &Path, status: i32, program: &str, args: &[String]) {
    if let Ok(mut f) = std::fs::OpenOptions::new().append(true).open(inprocess) {
        let _ = writeln!(
            f,
            "--- FAILED: exit {status} ({program} {})",
            args.join(" ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::MockCommandRunner;
    use crate::mail::NullMailSender;
    use tempfile::tempdir;

    fn cfg(loop_dir: PathBuf) -> LoopConfig {
        LoopConfig {
            loop_dir,
            engine_binary: PathBuf::from("snapback"),
            engine_args: vec![],
            admin_email: Some("admin@example.com".to_string()),
        }
    }

    #[test]
    fn valid_trigger_moves_to_done_on_success() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("web01"), "").unwrap();
        let runner = MockCommandRunner::new();
        runner.push_success("all good");

        let processed = poll_once(&cfg(tmp.path().to_path_buf()), &runner, &NullMailSender).unwrap();
        assert_eq!(processed, 1);

        assert!(!tmp.path().join("web01").exists());
        assert!(!tmp.path().join("web01.inprocess").exists());

        let today = Local::now().format("%Y%m%d").to_string();
        let done_dir = tmp.path().join("done").join(today);
        let entries: Vec<_> = std::fs::read_dir(&done_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let calls = runner.calls();
        assert_eq!(calls[0].program, "snapback");
        assert_eq!(calls[0].args[0], "-l");
        assert_eq!(calls[0].args[2], "web01");
    }

    #[test]
    fn failed_launch_moves_to_errors_with_banner() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("web01"), "").unwrap();
        let runner = MockCommandRunner::new();
        runner.push_failure(2, "boom");

        poll_once(&cfg(tmp.path().to_path_buf()), &runner, &NullMailSender).unwrap();

        let err_dir = tmp.path().join("errors");
        let entries: Vec<_> = std::fs::read_dir(&err_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let contents = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        assert!(contents.contains("FAILED: exit 2"));
    }

    #[test]
    fn spurious_trigger_is_rejected_without_launching() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("evil; rm -rf /"), "").unwrap();
        let runner = MockCommandRunner::new();

        let processed = poll_once(&cfg(tmp.path().to_path_buf()), &runner, &NullMailSender).unwrap();
        assert_eq!(processed, 1);
        assert!(runner.calls().is_empty(), "spurious trigger must not launch the engine");
        assert!(!tmp.path().join("evil; rm -rf /").exists());

        let err_dir = tmp.path().join("errors");
        assert!(std::fs::read_dir(&err_dir).unwrap().count() == 1);
    }

    #[test]
    fn inprocess_and_done_suffixed_entries_are_skipped() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join("web01.inprocess"), "").unwrap();
        std::fs::write(tmp.path().join("web01.done"), "").unwrap();
        let runner = MockCommandRunner::new();

        let processed = poll_once(&cfg(tmp.path().to_path_buf()), &runner, &NullMailSender).unwrap();
        assert_eq!(processed, 0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn missing_loop_dir_is_not_an_error() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let runner = MockCommandRunner::new();
        let processed = poll_once(&cfg(missing), &runner, &NullMailSender).unwrap();
        assert_eq!(processed, 0);
    }
}
