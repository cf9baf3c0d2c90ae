//! Hard-link clone: reproduces a directory tree such that every
//! regular file in the clone shares an inode with its source
//! (spec.md §6, "Hard-link clone contract"). Implemented by shelling
//! out to the configured `Cp` program (`cp -al` by default) rather
//! than walking the tree ourselves, since the contract is inherently
//! about a specific external tool's semantics.

use std::path::Path;

use crate::command::CommandRunner;
use crate::error::{Result, SnapbackError};

/// Clone `src` to `dst` via `cp_command` (program followed by its fixed
/// flags; `src` and `dst` are appended as the final two arguments).
///
/// # Errors
///
/// Returns `CommandFailed` if the clone program exits non-zero, or
/// propagates the spawn error from the underlying `CommandRunner`.
pub fn hard_link_clone(
    runner: &dyn CommandRunner,
    cp_command: &[String],
    src: &Path,
    dst: &Path,
) -> Result<()> {
    let Some((program, fixed_args)) = cp_command.split_first() else {
        return Err(SnapbackError::Other(anyhow::anyhow!(
            "Cp directive resolved to an empty command"
        )));
    };

    let mut args: Vec<String> = fixed_args.to_vec();
    args.push(src.display().to_string());
    args.push(dst.display().to_string());

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
