//! Execution backends: polymorphic command runners.
//!
//! One trait, three implementations selected at process start and passed down
//! explicitly (no ambient globals):
//!
//! - [`live::LiveBackend`] spawns real processes,
//! - [`dry_run::DryRunBackend`] logs what would run and reports success,
//! - [`mock::MockBackend`] records every invocation for tests.
//!
//! # Soft vs. checked
//!
//! `execute_command` reports a non-zero exit as *data* — the caller decides
//! what is fatal. `check_command`/`check_output` invert this and convert a
//! non-zero exit into a propagated [`EngineError::CommandFailed`], for call
//! sites with no meaningful recovery path. This split lets the engine express
//! both "try this, I'll handle failure" and "this must succeed or we stop"
//! without two parallel APIs per operation.

pub mod dry_run;
pub mod live;
pub mod mock;

use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use serde::Serialize;
use strum::Display;

use crate::error::{EngineError, Result};
use crate::script::ScriptBuilder;

/// Sentinel exit code reported when the child process could not be spawned
/// at all (the shell convention for "command not found").
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Sentinel exit code reported when the child was terminated by a signal.
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// Which backend produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
pub enum BackendKind {
    Live,
    DryRun,
    Mock,
}

/// Outcome of running a command or a whole script. Produced once per
/// execution; the engine never retries on its own — retry policy belongs to
/// the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub captured_lines: Vec<String>,
    pub backend_kind: BackendKind,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Common contract for all command runners.
pub trait ExecutionBackend {
    fn kind(&self) -> BackendKind;

    /// Run a command, reporting the exit code as data. Spawn failure is
    /// reported with [`SPAWN_FAILURE_EXIT_CODE`], signal death with
    /// [`SIGNAL_EXIT_CODE`]; neither is an `Err`.
    fn execute_command(&self, command: &str) -> Result<i32>;

    /// Run a command and hand back a pull-based stream over its output.
    fn execute_command_iter(&self, command: &str) -> Result<CommandStream>;

    /// Run a command that must succeed. Non-zero exit becomes
    /// [`EngineError::CommandFailed`].
    fn check_command(&self, command: &str) -> Result<()> {
        let exit_code = self.execute_command(command)?;
        if exit_code == 0 {
            Ok(())
        } else {
            Err(EngineError::command_failed(command, exit_code))
        }
    }

    /// Run a command that must succeed and return its output lines, in order.
    fn check_output(&self, command: &str) -> Result<Vec<String>>;

    /// Fetch `url` into `dest`, reporting the exit code as data.
    fn download_file(&self, url: &str, dest: &Path) -> Result<i32>;

    /// Run a whole rendered script and capture the result.
    fn execute_script(&self, script: &ScriptBuilder) -> Result<ExecutionResult>;
}

/// What a single pull from a [`CommandStream`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRead {
    /// A chunk of output, up to and including the requested terminator (or
    /// the unterminated tail once the stream has closed).
    Data(String),
    /// No complete chunk is available yet, but the stream is still open.
    Pending,
    /// Terminal state: the process closed its output and the buffer is drained.
    Closed,
}

/// Cooperative pull-based stream over a command's output.
///
/// The live backend feeds this from a reader thread through a channel; the
/// other backends construct it from canned lines. Consumers poll `getline`
/// or `get_until` and branch on [`StreamRead`]; nothing here is coupled to
/// any presentation layer's event loop.
#[derive(Debug)]
pub struct CommandStream {
    rx: Option<Receiver<Vec<u8>>>,
    buf: Vec<u8>,
    child: Option<std::process::Child>,
    canned_exit: Option<i32>,
}

/// How long a single pull waits for the reader thread before reporting
/// `Pending`. Keeps pollers from busy-waiting without blocking them for
/// longer than the child's own output cadence.
const PULL_TIMEOUT: Duration = Duration::from_millis(25);

impl CommandStream {
    /// Stream fed by a live reader thread, owning the child for `wait`.
    pub(crate) fn spawned(rx: Receiver<Vec<u8>>, child: std::process::Child) -> Self {
        Self {
            rx: Some(rx),
            buf: Vec::new(),
            child: Some(child),
            canned_exit: None,
        }
    }

    /// Stream pre-filled with canned output and a fixed exit code.
    pub(crate) fn canned(lines: &[String], exit_code: i32) -> Self {
        let mut buf = Vec::new();
        for line in lines {
            buf.extend_from_slice(line.as_bytes());
            buf.push(b'\n');
        }
        Self {
            rx: None,
            buf,
            child: None,
            canned_exit: Some(exit_code),
        }
    }

    /// Read up to and including the next newline.
    pub fn getline(&mut self) -> StreamRead {
        self.get_until('\n')
    }

    /// Read up to and including the next occurrence of `delim`.
    pub fn get_until(&mut self, delim: char) -> StreamRead {
        let mut delim_buf = [0u8; 4];
        let delim_bytes = delim.encode_utf8(&mut delim_buf).as_bytes().to_vec();

        loop {
            if let Some(pos) = find_subsequence(&self.buf, &delim_bytes) {
                let chunk: Vec<u8> = self.buf.drain(..pos + delim_bytes.len()).collect();
                return StreamRead::Data(String::from_utf8_lossy(&chunk).into_owned());
            }

            match &self.rx {
                Some(rx) => match rx.recv_timeout(PULL_TIMEOUT) {
                    Ok(chunk) => self.buf.extend_from_slice(&chunk),
                    Err(RecvTimeoutError::Timeout) => return StreamRead::Pending,
                    Err(RecvTimeoutError::Disconnected) => {
                        self.rx = None;
                        return self.drain_tail();
                    }
                },
                None => return self.drain_tail(),
            }
        }
    }

    /// Flush whatever unterminated output remains after the stream closed.
    fn drain_tail(&mut self) -> StreamRead {
        if self.buf.is_empty() {
            StreamRead::Closed
        } else {
            let tail: Vec<u8> = std::mem::take(&mut self.buf);
            StreamRead::Data(String::from_utf8_lossy(&tail).into_owned())
        }
    }

    /// Block until the underlying process exits and return its exit code.
    /// Canned streams return their fixed code immediately.
    pub fn wait(&mut self) -> Result<i32> {
        if let Some(exit_code) = self.canned_exit {
            return Ok(exit_code);
        }
        match self.child.take() {
            Some(mut child) => {
                let status = child.wait()?;
                Ok(status.code().unwrap_or(SIGNAL_EXIT_CODE))
            }
            None => Ok(SIGNAL_EXIT_CODE),
        }
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
