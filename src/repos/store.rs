//! Storage adapter for repository definition files.
//!
//! The on-disk format is the key-grouped dnf `.repo` dialect: a `[id]` group
//! header followed by `key=value` lines (`name`, `baseurl` or `metalink`,
//! `enabled`, `gpgcheck`, `gpgkey`). The adapter validates required fields
//! before a definition is accepted: a group must carry a `name` and at least
//! one of `baseurl`/`metalink`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::repos::{RepoUri, Repository};

/// Pluggable persistence for repository definitions.
pub trait RepoStore {
    /// Parse every repository group found in the definition file at `path`.
    fn read_definitions(&self, path: &Path) -> Result<Vec<Repository>>;

    /// Write the given repositories as one definition file at `path`.
    fn write_definition(&self, path: &Path, repos: &[Repository]) -> Result<()>;
}

/// Filesystem-backed store for `.repo` files.
#[derive(Debug, Default)]
pub struct RepoFileStore;

impl RepoFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl RepoStore for RepoFileStore {
    fn read_definitions(&self, path: &Path) -> Result<Vec<Repository>> {
        let text = fs::read_to_string(path)?;
        parse_repo_file(&text, path)
    }

    fn write_definition(&self, path: &Path, repos: &[Repository]) -> Result<()> {
        fs::write(path, render_repo_file(repos))?;
        Ok(())
    }
}

/// Parse `.repo` text into repositories, attributing errors to `source`.
pub fn parse_repo_file(text: &str, source: &Path) -> Result<Vec<Repository>> {
    let mut repos = Vec::new();
    let mut current: Option<RepoGroup> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(id) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            if let Some(group) = current.take() {
                repos.push(group.finish(source)?);
            }
            if id.trim().is_empty() {
                return Err(EngineError::malformed_repo(
                    source.display().to_string(),
                    format!("empty group header at line {}", lineno + 1),
                ));
            }
            current = Some(RepoGroup::new(id.trim()));
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(EngineError::malformed_repo(
                source.display().to_string(),
                format!("expected key=value at line {}: {:?}", lineno + 1, line),
            ));
        };
        let Some(group) = current.as_mut() else {
            return Err(EngineError::malformed_repo(
                source.display().to_string(),
                format!("key outside of a [group] at line {}", lineno + 1),
            ));
        };
        group.set(key.trim(), value.trim());
    }

    if let Some(group) = current.take() {
        repos.push(group.finish(source)?);
    }

    if repos.is_empty() {
        return Err(EngineError::malformed_repo(
            source.display().to_string(),
            "no repository groups found",
        ));
    }

    // A file defining the same group twice is ambiguous; reject it rather
    // than letting the later group silently win.
    let mut seen = HashSet::new();
    for repo in &repos {
        if !seen.insert(repo.id.as_str()) {
            return Err(EngineError::malformed_repo(
                source.display().to_string(),
                format!("group [{}] is defined more than once", repo.id),
            ));
        }
    }
    Ok(repos)
}

/// Render repositories back into `.repo` text.
pub fn render_repo_file(repos: &[Repository]) -> String {
    let mut out = String::new();
    for (i, repo) in repos.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!("[{}]\n", repo.id));
        out.push_str(&format!("name={}\n", repo.name));
        match &repo.uri {
            Some(RepoUri::BaseUrl(url)) => out.push_str(&format!("baseurl={}\n", url)),
            Some(RepoUri::Metalink(url)) => out.push_str(&format!("metalink={}\n", url)),
            None => {}
        }
        out.push_str(&format!("enabled={}\n", if repo.enabled { 1 } else { 0 }));
        if let Some(gpgcheck) = repo.gpgcheck {
            out.push_str(&format!("gpgcheck={}\n", if gpgcheck { 1 } else { 0 }));
        }
        if let Some(gpgkey) = &repo.gpgkey {
            out.push_str(&format!("gpgkey={}\n", gpgkey));
        }
    }
    out
}

/// Accumulator for one `[id]` group while parsing.
struct RepoGroup {
    id: String,
    name: Option<String>,
    baseurl: Option<String>,
    metalink: Option<String>,
    enabled: bool,
    gpgcheck: Option<bool>,
    gpgkey: Option<String>,
}

impl RepoGroup {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            baseurl: None,
            metalink: None,
            enabled: true,
            gpgcheck: None,
            gpgkey: None,
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match key {
            "name" => self.name = Some(value.to_string()),
            "baseurl" => self.baseurl = Some(value.to_string()),
            "metalink" => self.metalink = Some(value.to_string()),
            "enabled" => self.enabled = value == "1" || value.eq_ignore_ascii_case("true"),
            "gpgcheck" => {
                self.gpgcheck = Some(value == "1" || value.eq_ignore_ascii_case("true"))
            }
            "gpgkey" => self.gpgkey = Some(value.to_string()),
            // Unknown keys (cost, priority, ...) are preserved by dnf but
            // irrelevant to the registry; skip them.
            _ => {}
        }
    }

    fn finish(self, source: &Path) -> Result<Repository> {
        let Some(name) = self.name else {
            return Err(EngineError::malformed_repo(
                source.display().to_string(),
                format!("group [{}] is missing required key: name", self.id),
            ));
        };
        let uri = match (self.baseurl, self.metalink) {
            (Some(url), _) => Some(RepoUri::BaseUrl(url)),
            (None, Some(url)) => Some(RepoUri::Metalink(url)),
            (None, None) => {
                return Err(EngineError::malformed_repo(
                    source.display().to_string(),
                    format!("group [{}] needs baseurl or metalink", self.id),
                ));
            }
        };
        Ok(Repository {
            id: self.id,
            name,
            uri,
            enabled: self.enabled,
            source_path: PathBuf::from(source),
            gpgcheck: self.gpgcheck,
            gpgkey: self.gpgkey,
        })
    }
}
