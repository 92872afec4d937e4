//! hpcforge engine library
//!
//! Declarative, idempotent configuration-script engine for unattended HPC
//! cluster installs: abstract operations are lowered against an OS identity
//! into bash, executed through a swappable backend, with package sources
//! tracked in a repository registry.

pub mod backend;
pub mod cli;
pub mod error;
pub mod installer;
pub mod os_identity;
pub mod plan;
pub mod process_guard;
pub mod repos;
pub mod resolver;
pub mod script;

// Re-export main types for convenience
pub use backend::dry_run::DryRunBackend;
pub use backend::live::LiveBackend;
pub use backend::mock::MockBackend;
pub use backend::{
    BackendKind, CommandStream, ExecutionBackend, ExecutionResult, StreamRead,
    SIGNAL_EXIT_CODE, SPAWN_FAILURE_EXIT_CODE,
};
pub use error::{EngineError, Result};
pub use installer::{apply, build_script};
pub use os_identity::{Architecture, Distro, OsFamily, OsIdentity, PlatformTag};
pub use plan::{FileDirective, InstallPlan, RepoPlan, ServicePlan};
pub use process_guard::CommandProcessGroup;
pub use repos::store::{RepoFileStore, RepoStore};
pub use repos::{RepoRegistry, RepoUri, Repository};
pub use resolver::{resolver_for, ElResolver, PlatformResolver};
pub use script::{content_digest, Operation, ScriptBuilder, SCRIPT_HEADER};
