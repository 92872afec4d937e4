//! Live execution backend: spawns real processes.
//!
//! Commands run under `bash -c` in their own process group (see
//! [`crate::process_guard`]). Blocking execution captures output whole;
//! incremental execution hands the caller a [`CommandStream`] fed by a
//! dedicated reader thread, so the engine never ties process output to any
//! event loop.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::mpsc;

use log::{debug, info, warn};

use crate::backend::{
    BackendKind, CommandStream, ExecutionBackend, ExecutionResult, SIGNAL_EXIT_CODE,
    SPAWN_FAILURE_EXIT_CODE,
};
use crate::error::{EngineError, Result};
use crate::process_guard::CommandProcessGroup;
use crate::script::ScriptBuilder;

/// Backend that executes commands on the host it runs on.
#[derive(Debug, Default)]
pub struct LiveBackend;

impl LiveBackend {
    pub fn new() -> Self {
        Self
    }

    /// Run `bash` with the given args, capturing output. Spawn failure maps
    /// to the sentinel exit code rather than an error.
    fn run_bash(&self, display: &str, args: &[&str]) -> Result<(i32, Vec<String>)> {
        let output = match Command::new("bash")
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .in_new_process_group()
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                warn!("failed to spawn {:?}: {}", display, e);
                return Ok((SPAWN_FAILURE_EXIT_CODE, Vec::new()));
            }
        };

        let exit_code = output.status.code().unwrap_or(SIGNAL_EXIT_CODE);
        let lines: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            debug!("stderr: {}", line);
        }
        Ok((exit_code, lines))
    }
}

impl ExecutionBackend for LiveBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Live
    }

    fn execute_command(&self, command: &str) -> Result<i32> {
        info!("executing: {}", command);
        let (exit_code, lines) = self.run_bash(command, &["-c", command])?;
        for line in &lines {
            debug!("stdout: {}", line);
        }
        Ok(exit_code)
    }

    fn execute_command_iter(&self, command: &str) -> Result<CommandStream> {
        info!("executing (streaming): {}", command);
        let mut child = match Command::new("bash")
            .args(["-c", command])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .in_new_process_group()
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return Err(EngineError::spawn(format!("{}: {}", command, e))),
        };

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::spawn(format!("{}: no stdout pipe", command)))?;

        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        // Reader thread drains the pipe so the child never blocks on a full
        // buffer while the consumer is between pulls. Dropping tx on EOF is
        // what turns the stream's state to Closed.
        std::thread::spawn(move || {
            let mut chunk = [0u8; 4096];
            loop {
                match stdout.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(chunk[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("stream read ended: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(CommandStream::spawned(rx, child))
    }

    fn check_output(&self, command: &str) -> Result<Vec<String>> {
        info!("executing (checked): {}", command);
        let (exit_code, lines) = self.run_bash(command, &["-c", command])?;
        if exit_code == 0 {
            Ok(lines)
        } else {
            Err(EngineError::command_failed(command, exit_code))
        }
    }

    fn download_file(&self, url: &str, dest: &Path) -> Result<i32> {
        let command = format!("curl -fsSL -o \"{}\" \"{}\"", dest.display(), url);
        self.execute_command(&command)
    }

    fn execute_script(&self, script: &ScriptBuilder) -> Result<ExecutionResult> {
        info!(
            "executing script ({} commands) for {}",
            script.len(),
            script.os()
        );
        // Strict-mode flags passed explicitly: `bash -c` treats the shebang
        // line as a comment, so -xeu would otherwise be lost.
        let text = script.render();
        let (exit_code, captured_lines) =
            self.run_bash("<script>", &["-x", "-e", "-u", "-c", text.as_str()])?;
        Ok(ExecutionResult {
            exit_code,
            captured_lines,
            backend_kind: BackendKind::Live,
        })
    }
}
