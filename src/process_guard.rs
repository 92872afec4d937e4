//! Process group isolation for spawned shell commands.
//!
//! The live backend spawns `bash -c` children for potentially long-running
//! package operations. Each child runs in its own process group with a parent
//! death signal, so an installer that dies mid-run cannot leave an orphaned
//! `dnf` transaction chewing on the target system.

use nix::libc;
use nix::unistd::Pid;

/// Extension trait configuring a [`std::process::Command`] to run in its own
/// process group.
pub trait CommandProcessGroup {
    /// Configure the command to run in its own process group, with SIGTERM
    /// delivered to the child if the parent dies first.
    fn in_new_process_group(&mut self) -> &mut Self;
}

impl CommandProcessGroup for std::process::Command {
    fn in_new_process_group(&mut self) -> &mut Self {
        use std::os::unix::process::CommandExt;
        // process_group(0) creates a new process group with PGID = child PID
        unsafe {
            self.pre_exec(|| {
                nix::unistd::setpgid(Pid::from_raw(0), Pid::from_raw(0))
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

                // Child dies with the parent rather than running unattended.
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM) == -1 {
                    return Err(std::io::Error::last_os_error());
                }

                Ok(())
            });
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    #[test]
    fn test_command_in_new_group_still_runs() {
        let output = Command::new("sh")
            .args(["-c", "echo ok"])
            .in_new_process_group()
            .stdout(Stdio::piped())
            .output()
            .expect("spawn sh");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "ok");
    }
}
