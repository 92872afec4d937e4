//! End-to-end tests: plan file → script → backend
//!
//! These tests drive the engine the way the CLI does: load a JSON plan from
//! disk, validate it, lower it, and run it through a backend.

use hpcforge::{installer, BackendKind, DryRunBackend, InstallPlan, MockBackend};

const NODE_PLAN: &str = r#"{
  "os": {
    "family": "Linux",
    "distro": "Rocky",
    "platform_tag": "El9",
    "major_version": 9,
    "minor_version": 4,
    "architecture": "X86_64"
  },
  "repos": { "enable": ["epel", "crb"] },
  "packages": ["epel-release", "munge", "slurm-slurmd"],
  "files": [
    {
      "action": "ensure_line",
      "path": "/etc/hosts",
      "match_key": "head01",
      "line": "10.1.0.1 head01"
    },
    {
      "action": "materialize",
      "path": "/etc/slurm/slurm.conf",
      "content": "ClusterName=hpc01\nSlurmctldHost=head01"
    }
  ],
  "services": { "enable": ["munge", "slurmd"] }
}"#;

fn load_plan() -> InstallPlan {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("node.json");
    std::fs::write(&path, NODE_PLAN).unwrap();
    let plan = InstallPlan::load_from_file(&path).unwrap();
    plan.validate().unwrap();
    plan
}

#[test]
fn test_plan_renders_deterministically() {
    let plan = load_plan();
    let first = installer::build_script(&plan).unwrap().render();
    let second = installer::build_script(&plan).unwrap().render();
    assert_eq!(first, second);
    assert!(first.starts_with("#!/bin/bash -xeu\n"));
    assert!(first.contains("dnf config-manager --set-enabled epel"));
    assert!(first.contains("dnf install -y slurm-slurmd"));
    assert!(first.contains("grep -q \"head01\" \"/etc/hosts\""));
    assert!(first.contains("md5sum -c --quiet -"));
    assert!(first.contains("systemctl enable --now slurmd"));
}

#[test]
fn test_apply_via_mock_accounts_for_every_operation() {
    let plan = load_plan();
    let backend = MockBackend::new();
    let result = installer::apply(&plan, &backend).unwrap();

    assert!(result.success());
    assert_eq!(result.backend_kind, BackendKind::Mock);
    assert_eq!(backend.call_count("dnf install -y epel-release"), 1);
    assert_eq!(backend.call_count("dnf install -y munge"), 1);
    assert_eq!(backend.call_count("dnf config-manager --set-enabled crb"), 1);
    assert_eq!(backend.call_count("systemctl enable --now munge"), 1);
    // Nothing from the plan was executed twice.
    assert_eq!(backend.call_count("dnf install -y slurm-slurmd"), 1);
}

#[test]
fn test_apply_via_dry_run_touches_nothing() {
    let plan = load_plan();
    let result = installer::apply(&plan, &DryRunBackend::new()).unwrap();
    assert!(result.success());
    assert!(result.captured_lines.is_empty());
    assert!(!std::path::Path::new("/etc/slurm/slurm.conf").exists());
}

#[test]
fn test_plan_save_load_roundtrip_preserves_script() {
    let plan = load_plan();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copy.json");
    plan.save_to_file(&path).unwrap();
    let reloaded = InstallPlan::load_from_file(&path).unwrap();

    assert_eq!(
        installer::build_script(&plan).unwrap().render(),
        installer::build_script(&reloaded).unwrap().render()
    );
}
