//! Plan orchestration: lower a whole [`InstallPlan`] and run it.
//!
//! Lowering order is fixed and deterministic: repository toggles first (so
//! installs see the right package sources), then package removals, package
//! installs, file directives, and finally services. Within each group the
//! plan's own order is preserved.

use log::info;

use crate::backend::{ExecutionBackend, ExecutionResult};
use crate::error::Result;
use crate::plan::{FileDirective, InstallPlan};
use crate::repos::RepoRegistry;
use crate::script::ScriptBuilder;

/// Lower every intent in `plan` into one script.
pub fn build_script(plan: &InstallPlan) -> Result<ScriptBuilder> {
    let mut script = ScriptBuilder::new(plan.os)?;

    if !plan.repos.enable.is_empty() || !plan.repos.disable.is_empty() {
        script.add_command("# package sources");
        for id in &plan.repos.enable {
            script.enable_repo(id);
        }
        for id in &plan.repos.disable {
            script.disable_repo(id);
        }
        script.add_newline();
    }

    if !plan.remove_packages.is_empty() || !plan.packages.is_empty() {
        script.add_command("# packages");
        for pkg in &plan.remove_packages {
            script.remove_package(pkg);
        }
        for pkg in &plan.packages {
            script.add_package(pkg);
        }
        script.add_newline();
    }

    if !plan.files.is_empty() {
        script.add_command("# files");
        for directive in &plan.files {
            match directive {
                FileDirective::EnsureLine {
                    path,
                    match_key,
                    line,
                } => {
                    script.add_line_to_file(path, match_key, line);
                }
                FileDirective::Materialize { path, content } => {
                    script.add_file_template(path, content);
                }
                FileDirective::RemoveLine { path, key } => {
                    script.remove_line_with_key(path, key);
                }
            }
        }
        script.add_newline();
    }

    let services = &plan.services;
    if !services.enable.is_empty()
        || !services.disable.is_empty()
        || !services.start.is_empty()
        || !services.stop.is_empty()
    {
        script.add_command("# services");
        for svc in &services.enable {
            script.enable_service(svc);
        }
        for svc in &services.start {
            script.start_service(svc);
        }
        for svc in &services.stop {
            script.stop_service(svc);
        }
        for svc in &services.disable {
            script.disable_service(svc);
        }
    }

    Ok(script)
}

/// Converge a target to `plan` through the given backend.
///
/// The repository registry is consulted first: definition files from the
/// plan are installed and the requested toggles are applied, so an unknown
/// repository id fails here, before any command runs on the target.
pub fn apply(plan: &InstallPlan, backend: &dyn ExecutionBackend) -> Result<ExecutionResult> {
    let mut registry = RepoRegistry::new(plan.os);
    registry.initialize_default_repositories();

    for path in &plan.repos.install_files {
        registry.install(path)?;
    }

    let enable: Vec<&str> = plan.repos.enable.iter().map(String::as_str).collect();
    let disable: Vec<&str> = plan.repos.disable.iter().map(String::as_str).collect();
    registry.enable_all(&enable)?;
    registry.disable_all(&disable)?;

    info!(
        "applying plan for {} via {} backend ({} active repos)",
        plan.os,
        backend.kind(),
        registry.enabled_ids().len()
    );

    let script = build_script(plan)?;
    backend.execute_script(&script)
}
