//! Ring Rotator: ages numbered slot directories within a tier by
//! shelling out to the configured `Rm`/`Mv` programs, the same
//! `CommandRunner`-mediated pattern `clone.rs` uses for `Cp`.

use std::path::{Path, PathBuf};

use crate::command::CommandRunner;
use crate::error::{Result, SnapbackError};

/// The path of slot `n` within tier `base` (`base.0`, `base.1`, ...).
#[must_use]
pub fn slot_path(base: &Path, n: u32) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(format!(".{n}"));
    PathBuf::from(s)
}

/// Rotate `base.0 .. base.{max-1}` in place.
///
/// `rotate_all = false` (hourly) preserves slot 0; `rotate_all = true`
/// (daily/weekly/monthly) rotates slot 0 too, making room for a fresh
/// promotion clone at slot 0.
///
/// # Errors
///
/// Any failed remove or rename is fatal for the caller's job.
pub fn rotate(
    runner: &dyn CommandRunner,
    rm_command: &[String],
    mv_command: &[String],
    base: &Path,
    max: u32,
    rotate_all: bool,
) -> Result<()> {
    if max == 1 && !rotate_all {
        return Ok(());
    }
    if max == 0 {
        return Ok(());
    }

    let top = slot_path(base, max - 1);
    if top.exists() {
        remove_tree(runner, rm_command, &top)?;
    }

    let smallest = if rotate_all { 0 } else { 1 };
    // `max - 2` underflows for `max == 1` (daily/weekly/monthly with
    // retention 1) and the hourly `max == 2` case lands exactly on
    // `smallest`, so the shift loop must be skippable entirely rather
    // than a do-while that always runs its body once.
    if max >= smallest + 2 {
        for i in (smallest..=max - 2).rev() {
            let from = slot_path(base, i);
            let to = slot_path(base, i + 1);
            if from.exists() {
                rename(runner, mv_command, &from, &to)?;
            }
        }
    }
    Ok(())
}

fn remove_tree(runner: &dyn CommandRunner, rm_command: &[String], path: &Path) -> Result<()> {
    let Some((program, fixed_args)) = rm_command.split_first() else {
        return Err(SnapbackError::Other(anyhow::anyhow!(
            "Rm directive resolved to an empty command"
        )));
    };
    let mut args: Vec<String> = fixed_args.to_vec();
    args.push(path.display().to_string());
    let output = runner.run(program, &args, None)?;
    if !output.success() {
        return Err(SnapbackError::CommandFailed {
            program: program.clone(),
            status: output.status,
            stderr: output.stderr,
        });
    }
    Ok(())
}

fn rename(runner: &dyn CommandRunner, mv_command: &[String], from: &Path, to: &Path) -> Result<()> {
    let Some((program, fixed_args)) = mv_command.split_first() else {
        return Err(SnapbackError::Other(anyhow::anyhow!(
            "Mv directive resolved to an empty command"
        )));
    };
    let mut args: Vec<String> = fixed_args.to_vec();
    args.push(from.display().to_string());
    args.push(to.display().to_string());
    let output = runner.run(program, &args, None)?;
    if !output.success() {
        return Err(SnapbackError::CommandFailed {
            program: program.clone(),
            status: output.status,
            stderr: output.stderr,
        });
    }
    Ok(())
}
