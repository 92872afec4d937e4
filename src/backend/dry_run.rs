//! Dry-run backend: logs what would run, touches nothing.
//!
//! Every operation reports synthetic success so a preview run exercises the
//! same call paths as a real one. `check_output` returns an empty sequence
//! rather than failing, so callers that branch on output content degrade
//! gracefully instead of aborting the preview.

use std::path::Path;

use log::info;

use crate::backend::{BackendKind, CommandStream, ExecutionBackend, ExecutionResult};
use crate::error::Result;
use crate::script::ScriptBuilder;

/// Backend that never spawns a process.
#[derive(Debug, Default)]
pub struct DryRunBackend;

impl DryRunBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionBackend for DryRunBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DryRun
    }

    fn execute_command(&self, command: &str) -> Result<i32> {
        info!("[dry-run] would execute: {}", command);
        Ok(0)
    }

    fn execute_command_iter(&self, command: &str) -> Result<CommandStream> {
        info!("[dry-run] would execute (streaming): {}", command);
        Ok(CommandStream::canned(&[], 0))
    }

    fn check_output(&self, command: &str) -> Result<Vec<String>> {
        info!("[dry-run] would execute (checked): {}", command);
        Ok(Vec::new())
    }

    fn download_file(&self, url: &str, dest: &Path) -> Result<i32> {
        info!("[dry-run] would download {} -> {}", url, dest.display());
        Ok(0)
    }

    fn execute_script(&self, script: &ScriptBuilder) -> Result<ExecutionResult> {
        info!(
            "[dry-run] would execute script ({} commands) for {}:",
            script.len(),
            script.os()
        );
        for command in script.commands() {
            for line in command.lines() {
                info!("[dry-run]   {}", line);
            }
        }
        Ok(ExecutionResult {
            exit_code: 0,
            captured_lines: Vec::new(),
            backend_kind: BackendKind::DryRun,
        })
    }
}
