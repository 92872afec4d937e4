//! Recording backend for tests: no OS required.
//!
//! Every invocation is appended to an in-memory ordered log keyed by the
//! command text (or a caller-supplied identifier for parameterized calls).
//! Results are canned: exit codes and output lines can be staged per command
//! ahead of time, defaulting to success with no output.
//!
//! The query side is total: asking about a command that was never run, or an
//! out-of-range call index, returns zero/empty — never a panic — so test
//! assertions stay straightforward.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use log::debug;

use crate::backend::{BackendKind, CommandStream, ExecutionBackend, ExecutionResult};
use crate::error::{EngineError, Result};
use crate::script::ScriptBuilder;

#[derive(Debug, Default)]
struct CallLog {
    /// Per-key ordered parameter lists, one entry per invocation.
    calls: HashMap<String, Vec<Vec<String>>>,
    /// Keys in global invocation order, duplicates included.
    sequence: Vec<String>,
    canned_exit: HashMap<String, i32>,
    canned_output: HashMap<String, Vec<String>>,
}

/// Backend that records invocations and replays canned results.
#[derive(Debug, Default)]
pub struct MockBackend {
    log: Mutex<CallLog>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the exit code `command` will report. Unstaged commands report 0.
    pub fn set_exit_code(&self, command: &str, exit_code: i32) {
        let mut log = self.log.lock().expect("mock log mutex poisoned");
        log.canned_exit.insert(command.to_string(), exit_code);
    }

    /// Stage the output lines `command` will produce. Unstaged commands
    /// produce none.
    pub fn set_output(&self, command: &str, lines: &[&str]) {
        let mut log = self.log.lock().expect("mock log mutex poisoned");
        log.canned_output
            .insert(command.to_string(), lines.iter().map(|s| s.to_string()).collect());
    }

    /// Record an invocation under `key` with its parameter list. Used by the
    /// backend trait methods and available to callers that mock higher-level
    /// message-bus style interfaces.
    pub fn record_call(&self, key: &str, params: &[&str]) {
        debug!("[mock] {} {:?}", key, params);
        let mut log = self.log.lock().expect("mock log mutex poisoned");
        log.calls
            .entry(key.to_string())
            .or_default()
            .push(params.iter().map(|s| s.to_string()).collect());
        log.sequence.push(key.to_string());
    }

    /// How many times `key` was invoked. Zero for unknown keys.
    pub fn call_count(&self, key: &str) -> usize {
        let log = self.log.lock().expect("mock log mutex poisoned");
        log.calls.get(key).map_or(0, Vec::len)
    }

    /// Parameters of the `n`th (zero-indexed) invocation of `key`. Empty for
    /// unknown keys and out-of-range indices.
    pub fn call_args(&self, key: &str, n: usize) -> Vec<String> {
        let log = self.log.lock().expect("mock log mutex poisoned");
        log.calls
            .get(key)
            .and_then(|calls| calls.get(n))
            .cloned()
            .unwrap_or_default()
    }

    /// The most recently invoked key, if anything was invoked.
    pub fn last_call(&self) -> Option<String> {
        let log = self.log.lock().expect("mock log mutex poisoned");
        log.sequence.last().cloned()
    }

    /// Total number of recorded invocations across all keys.
    pub fn total_calls(&self) -> usize {
        let log = self.log.lock().expect("mock log mutex poisoned");
        log.sequence.len()
    }

    fn staged_exit(&self, command: &str) -> i32 {
        let log = self.log.lock().expect("mock log mutex poisoned");
        log.canned_exit.get(command).copied().unwrap_or(0)
    }

    fn staged_output(&self, command: &str) -> Vec<String> {
        let log = self.log.lock().expect("mock log mutex poisoned");
        log.canned_output.get(command).cloned().unwrap_or_default()
    }
}

impl ExecutionBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn execute_command(&self, command: &str) -> Result<i32> {
        self.record_call(command, &[]);
        Ok(self.staged_exit(command))
    }

    fn execute_command_iter(&self, command: &str) -> Result<CommandStream> {
        self.record_call(command, &[]);
        let lines = self.staged_output(command);
        Ok(CommandStream::canned(&lines, self.staged_exit(command)))
    }

    fn check_output(&self, command: &str) -> Result<Vec<String>> {
        self.record_call(command, &[]);
        let exit_code = self.staged_exit(command);
        if exit_code == 0 {
            Ok(self.staged_output(command))
        } else {
            Err(EngineError::command_failed(command, exit_code))
        }
    }

    fn download_file(&self, url: &str, dest: &Path) -> Result<i32> {
        let dest = dest.display().to_string();
        self.record_call("download_file", &[url, &dest]);
        Ok(self.staged_exit("download_file"))
    }

    fn execute_script(&self, script: &ScriptBuilder) -> Result<ExecutionResult> {
        // Commands recorded individually so tests can account per operation.
        for command in script.commands() {
            self.record_call(command, &[]);
        }
        Ok(ExecutionResult {
            exit_code: 0,
            captured_lines: Vec::new(),
            backend_kind: BackendKind::Mock,
        })
    }
}
