//! Install plan handling for saving and loading converge targets.
//!
//! An [`InstallPlan`] is the declarative input the engine converges a target
//! machine to: the OS identity plus package, repository, file and service
//! intents. The excluded wizard emits one of these; operators can also write
//! them by hand and feed them to the CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::EngineError;
use crate::os_identity::OsIdentity;

/// Repository toggles applied before any packages are installed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoPlan {
    /// Repository ids to enable.
    #[serde(default)]
    pub enable: Vec<String>,
    /// Repository ids to disable.
    #[serde(default)]
    pub disable: Vec<String>,
    /// Definition files to register before toggling.
    #[serde(default)]
    pub install_files: Vec<PathBuf>,
}

/// Service intents, applied after packages and files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServicePlan {
    #[serde(default)]
    pub enable: Vec<String>,
    #[serde(default)]
    pub disable: Vec<String>,
    #[serde(default)]
    pub start: Vec<String>,
    #[serde(default)]
    pub stop: Vec<String>,
}

/// One file intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FileDirective {
    /// Append `line` unless `match_key` already occurs in the file.
    EnsureLine {
        path: String,
        match_key: String,
        line: String,
    },
    /// Rewrite the file when its content checksum differs.
    Materialize { path: String, content: String },
    /// Delete every line matching `key`.
    RemoveLine { path: String, key: String },
}

impl FileDirective {
    pub fn path(&self) -> &str {
        match self {
            FileDirective::EnsureLine { path, .. } => path,
            FileDirective::Materialize { path, .. } => path,
            FileDirective::RemoveLine { path, .. } => path,
        }
    }
}

/// Declarative converge target that can be saved/loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallPlan {
    pub os: OsIdentity,

    #[serde(default)]
    pub repos: RepoPlan,

    /// Packages to install, in order.
    #[serde(default)]
    pub packages: Vec<String>,

    /// Packages to remove before installing.
    #[serde(default)]
    pub remove_packages: Vec<String>,

    #[serde(default)]
    pub files: Vec<FileDirective>,

    #[serde(default)]
    pub services: ServicePlan,
}

impl InstallPlan {
    /// Create an empty plan for the given OS identity.
    pub fn new(os: OsIdentity) -> Self {
        Self {
            os,
            repos: RepoPlan::default(),
            packages: Vec::new(),
            remove_packages: Vec::new(),
            files: Vec::new(),
            services: ServicePlan::default(),
        }
    }

    /// Save plan to a JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize plan to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write plan to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load plan from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read plan from {:?}", path.as_ref()))?;

        let plan: Self = serde_json::from_str(&content).context("Failed to parse plan JSON")?;

        Ok(plan)
    }

    /// Validate the plan.
    ///
    /// The engine performs no shell escaping beyond what the generated
    /// commands require, so names are checked here for the obvious injection
    /// and typo cases before anything is lowered.
    pub fn validate(&self) -> crate::error::Result<()> {
        if !self.os.is_supported() {
            return Err(EngineError::validation(format!(
                "Unsupported OS identity: {}",
                self.os
            )));
        }

        for pkg in self.packages.iter().chain(self.remove_packages.iter()) {
            validate_bare_name("Package", pkg)?;
        }

        for svc in self
            .services
            .enable
            .iter()
            .chain(self.services.disable.iter())
            .chain(self.services.start.iter())
            .chain(self.services.stop.iter())
        {
            validate_bare_name("Service", svc)?;
        }

        for id in self.repos.enable.iter().chain(self.repos.disable.iter()) {
            validate_bare_name("Repository id", id)?;
        }

        for file in &self.files {
            let path = file.path().trim();
            if path.is_empty() {
                return Err(EngineError::validation("File directive has an empty path"));
            }
            if !path.starts_with('/') {
                return Err(EngineError::validation(format!(
                    "File path must be absolute: {}",
                    path
                )));
            }
        }

        Ok(())
    }
}

/// Package/service/repo names end up unquoted in generated shell text; keep
/// them to the character set the respective tools accept anyway.
fn validate_bare_name(what: &str, name: &str) -> crate::error::Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::validation(format!(
            "{} name must not be empty",
            what
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+' | '@' | ':'))
    {
        return Err(EngineError::validation(format!(
            "{} name contains invalid characters: {}",
            what, name
        )));
    }
    Ok(())
}
