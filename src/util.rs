//! Utilities for spawning external commands.

use std::os::unix::process::CommandExt;
use std::process::{exit, Command};

use nix::sys::wait::waitpid;
use nix::unistd::{fork, setsid, ForkResult};
use tracing::trace;

use crate::{Result, WmError};

/// Runs a command, fully detached from the window manager.
///
/// The child is double-forked: the intermediate process starts a new
/// session, forks the real command and exits immediately, so the
/// command reparents to init. The intermediate is reaped inline, which
/// is why no SIGCHLD handling is needed anywhere else.
pub fn spawn(cmd: &[String]) -> Result<()> {
    let Some((program, args)) = cmd.split_first() else {
        return Err(WmError::SpawnProc("empty command".into()));
    };
    trace!("spawning {:?}", cmd);

    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            waitpid(child, None).map_err(|e| WmError::SpawnProc(e.to_string()))?;
            Ok(())
        }
        Ok(ForkResult::Child) => {
            let _ = setsid();
            match unsafe { fork() } {
                Ok(ForkResult::Child) => {
                    let err = Command::new(program).args(args).exec();
                    eprintln!("tatamiwm: exec {} failed: {}", program, err);
                    exit(1);
                }
                _ => exit(0),
            }
        }
        Err(e) => Err(WmError::SpawnProc(e.to_string())),
    }
}
