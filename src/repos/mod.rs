//! Repository registry: the single source of truth for package sources.
//!
//! The registry catalogs repositories by unique id with an enable/disable
//! lifecycle. Disabling is not removal; nothing is ever implicitly deleted.
//! Accessors hand out cloned snapshots, never live references, so the only
//! way to change registry state is through the mutation operations here.
//!
//! Mutation methods take `&mut self`; a caller that shares a registry across
//! threads must wrap it in a mutex. The engine itself is single-threaded.

pub mod store;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::os_identity::{Distro, OsIdentity, PlatformTag};
use crate::repos::store::{RepoFileStore, RepoStore};

/// Where a repository's packages come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RepoUri {
    BaseUrl(String),
    Metalink(String),
}

/// One installable package source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    /// Unique key within a registry.
    pub id: String,
    pub name: String,
    pub uri: Option<RepoUri>,
    pub enabled: bool,
    /// Definition file this repository came from (or will be written to).
    pub source_path: PathBuf,
    pub gpgcheck: Option<bool>,
    pub gpgkey: Option<String>,
}

/// In-memory catalog of repositories for one OS identity.
pub struct RepoRegistry {
    os: OsIdentity,
    repos: BTreeMap<String, Repository>,
    store: Box<dyn RepoStore>,
}

impl RepoRegistry {
    /// Registry with the default filesystem store.
    pub fn new(os: OsIdentity) -> Self {
        Self::with_store(os, Box::new(RepoFileStore::new()))
    }

    /// Registry with an injected storage adapter (tests, alternate stores).
    pub fn with_store(os: OsIdentity, store: Box<dyn RepoStore>) -> Self {
        Self {
            os,
            repos: BTreeMap::new(),
            store,
        }
    }

    pub fn os(&self) -> &OsIdentity {
        &self.os
    }

    /// Seed the registry with the known repository set for the bound OS.
    ///
    /// Idempotent: ids that are already registered are left untouched, so a
    /// second call never duplicates entries or resets enable state.
    pub fn initialize_default_repositories(&mut self) {
        let mut seeded = 0usize;
        for repo in default_repositories(&self.os) {
            if self.repos.contains_key(&repo.id) {
                debug!("default repo {} already registered, skipping", repo.id);
                continue;
            }
            self.repos.insert(repo.id.clone(), repo);
            seeded += 1;
        }
        info!("seeded {} default repositories for {}", seeded, self.os);
    }

    /// Register one repository. Duplicate ids are a hard error, never a
    /// silent merge.
    pub fn register(&mut self, repo: Repository) -> Result<()> {
        if self.repos.contains_key(&repo.id) {
            return Err(EngineError::DuplicateRepository(repo.id));
        }
        debug!("registered repo {} (enabled={})", repo.id, repo.enabled);
        self.repos.insert(repo.id.clone(), repo);
        Ok(())
    }

    /// Register every repository described by the definition file at `path`.
    ///
    /// Required fields are validated by the storage adapter before anything
    /// is accepted; if any group's id collides with an existing entry the
    /// whole file is rejected and the registry is unchanged.
    pub fn install(&mut self, path: &Path) -> Result<()> {
        let repos = self.store.read_definitions(path)?;
        for repo in &repos {
            if self.repos.contains_key(&repo.id) {
                return Err(EngineError::DuplicateRepository(repo.id.clone()));
            }
        }
        for repo in repos {
            info!("installed repo {} from {}", repo.id, path.display());
            self.repos.insert(repo.id.clone(), repo);
        }
        Ok(())
    }

    pub fn enable(&mut self, id: &str) -> Result<()> {
        self.set_enabled(id, true)
    }

    pub fn disable(&mut self, id: &str) -> Result<()> {
        self.set_enabled(id, false)
    }

    /// Enable a batch of ids, best-effort: every known id is flipped, and the
    /// unknown ones are reported together afterwards.
    pub fn enable_all(&mut self, ids: &[&str]) -> Result<()> {
        self.set_all_enabled(ids, true)
    }

    /// Disable a batch of ids, best-effort (see [`Self::enable_all`]).
    pub fn disable_all(&mut self, ids: &[&str]) -> Result<()> {
        self.set_all_enabled(ids, false)
    }

    fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        match self.repos.get_mut(id) {
            Some(repo) => {
                repo.enabled = enabled;
                debug!("repo {} enabled={}", id, enabled);
                Ok(())
            }
            None => Err(EngineError::UnknownRepository(id.to_string())),
        }
    }

    fn set_all_enabled(&mut self, ids: &[&str], enabled: bool) -> Result<()> {
        let mut unknown = Vec::new();
        for id in ids {
            match self.set_enabled(id, enabled) {
                Ok(()) => {}
                Err(EngineError::UnknownRepository(id)) => unknown.push(id),
                Err(e) => return Err(e),
            }
        }
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(EngineError::UnknownRepositories(unknown))
        }
    }

    /// Snapshot of every repository, ordered by id.
    pub fn list_repos(&self) -> Vec<Repository> {
        self.repos.values().cloned().collect()
    }

    /// Snapshot of one repository, if registered.
    pub fn repo(&self, id: &str) -> Option<Repository> {
        self.repos.get(id).cloned()
    }

    /// Ids of the currently enabled repositories, ordered.
    pub fn enabled_ids(&self) -> Vec<String> {
        self.repos
            .values()
            .filter(|r| r.enabled)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Write the full catalog back out as one definition file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let repos = self.list_repos();
        self.store.write_definition(path, &repos)
    }
}

/// Known repository set per distro/platform. The ids match what the distros
/// ship in /etc/yum.repos.d.
fn default_repositories(os: &OsIdentity) -> Vec<Repository> {
    let source = match os.distro {
        Distro::Rocky => "/etc/yum.repos.d/rocky.repo",
        Distro::Alma => "/etc/yum.repos.d/almalinux.repo",
        Distro::Rhel => "/etc/yum.repos.d/redhat.repo",
    };
    // el8 ships the builder repo as PowerTools; el9 renamed it to CRB.
    let builder_id = match os.platform_tag {
        PlatformTag::El8 => "powertools",
        _ => "crb",
    };

    let mut repos = vec![
        seed(os, "baseos", "BaseOS", source, true),
        seed(os, "appstream", "AppStream", source, true),
        seed(os, "extras", "Extras", source, true),
        seed(os, builder_id, "Code Ready Builder", source, false),
    ];
    repos.push(seed(os, "epel", "Extra Packages for Enterprise Linux", "/etc/yum.repos.d/epel.repo", false));
    repos
}

fn seed(os: &OsIdentity, id: &str, name: &str, source: &str, enabled: bool) -> Repository {
    Repository {
        id: id.to_string(),
        name: format!("{} {} - {}", os.distro, os.major_version, name),
        uri: None,
        enabled,
        source_path: PathBuf::from(source),
        gpgcheck: Some(true),
        gpgkey: None,
    }
}
