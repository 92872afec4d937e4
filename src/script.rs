//! Script builder: accumulates operations and lowers them to bash.
//!
//! A [`ScriptBuilder`] is bound to one [`OsIdentity`] at construction and
//! lowers every operation eagerly, in call order, through the capability
//! resolver. The builder is append-only and always readable; there is no
//! finalize step.
//!
//! # Apply-time idempotence
//!
//! The file operations do not inspect the target filesystem at generation
//! time. Instead the *generated commands* carry their own guards (`grep -q`,
//! `md5sum -c`) so that running the same script twice leaves the target in
//! the same state as running it once.
//!
//! # Generated text contract
//!
//! The rendered script begins with `#!/bin/bash -xeu` (trace, abort on first
//! error, unset variable is an error). The idempotent append takes the
//! literal shape
//!
//! ```text
//! grep -q "<key>" "<path>" || \
//!   echo "<line>" >> "<path>"
//! ```
//!
//! and content materialization a comment line plus an `md5sum -c` gate with a
//! here-document. Operational tooling greps for these shapes; do not
//! restructure them casually.

use md5::{Digest, Md5};

use crate::error::Result;
use crate::os_identity::OsIdentity;
use crate::resolver::{resolver_for, PlatformResolver};

/// Interpreter directive for every generated script: fail fast, trace, and
/// treat unset variables as errors. This is the script's own failure policy,
/// independent of whichever execution backend runs it.
pub const SCRIPT_HEADER: &str = "#!/bin/bash -xeu";

/// A single intended effect on the target machine. Pure data; carries no
/// behavior until lowered through the capability resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Verbatim command text, no validation. Escape hatch and comments.
    RawCommand(String),
    InstallPackage(String),
    RemovePackage(String),
    EnableRepository(String),
    DisableRepository(String),
    /// Append `line` to `path` unless `match_key` already occurs in the file.
    EnsureLineInFile {
        path: String,
        match_key: String,
        line: String,
    },
    /// Rewrite `path` with `content` only when the content checksum differs.
    MaterializeFileIfChanged { path: String, content: String },
    EnableService(String),
    DisableService(String),
    StartService(String),
    StopService(String),
    /// Delete every line matching `key` from `path`; absent key is a no-op.
    RemoveLineWithKey { path: String, key: String },
}

impl Operation {
    /// Lower this operation to a single shell command string.
    ///
    /// Multi-line results (the file guards, here-documents) stay one command;
    /// the embedded newlines are part of the command text.
    fn lower(&self, resolver: &PlatformResolver) -> String {
        match self {
            Operation::RawCommand(text) => text.clone(),
            Operation::InstallPackage(name) => resolver.install_package(name),
            Operation::RemovePackage(name) => resolver.remove_package(name),
            Operation::EnableRepository(id) => resolver.enable_repo(id),
            Operation::DisableRepository(id) => resolver.disable_repo(id),
            Operation::EnableService(name) => resolver.enable_service(name),
            Operation::DisableService(name) => resolver.disable_service(name),
            Operation::StartService(name) => resolver.start_service(name),
            Operation::StopService(name) => resolver.stop_service(name),
            Operation::EnsureLineInFile {
                path,
                match_key,
                line,
            } => {
                format!(
                    "grep -q \"{}\" \"{}\" || \\\n  echo \"{}\" >> \"{}\"",
                    match_key, path, line, path
                )
            }
            Operation::MaterializeFileIfChanged { path, content } => {
                // The here-document always writes a final newline, so the
                // digest is taken over that normalized form — otherwise the
                // gate would never match and every run would rewrite.
                let body = content.trim_end_matches('\n');
                let digest = content_digest(&format!("{}\n", body));
                // md5sum's check format wants two spaces between hash and path.
                format!(
                    "# file: {path}\necho \"{digest}  {path}\" | md5sum -c --quiet - || cat <<EOF > {path}\n{body}\nEOF",
                    digest = digest,
                    path = path,
                    body = body,
                )
            }
            Operation::RemoveLineWithKey { path, key } => {
                format!("sed -i \"/{}/d\" \"{}\"", key, path)
            }
        }
    }
}

/// Hex MD5 digest of file content, as `md5sum` prints it.
///
/// A colliding checksum is treated as "unchanged" at apply time; that risk is
/// accepted, not detected.
pub fn content_digest(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

/// Ordered accumulation of lowered shell commands for one OS identity.
///
/// Order is preserved and significant: later commands may depend on earlier
/// ones' side effects. No reordering, no deduplication.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    os: OsIdentity,
    resolver: PlatformResolver,
    commands: Vec<String>,
}

impl ScriptBuilder {
    /// Create a builder bound to `os`.
    ///
    /// Resolution happens here, eagerly: an unsupported identity fails at
    /// construction rather than on the first package operation.
    pub fn new(os: OsIdentity) -> Result<Self> {
        let resolver = resolver_for(&os)?;
        Ok(Self {
            os,
            resolver,
            commands: Vec::new(),
        })
    }

    /// The identity this script was lowered for.
    pub fn os(&self) -> &OsIdentity {
        &self.os
    }

    /// Append an operation, lowering it immediately.
    pub fn push(&mut self, op: Operation) -> &mut Self {
        let lowered = op.lower(&self.resolver);
        log::debug!("lowered {:?} -> {:?}", op, lowered);
        self.commands.push(lowered);
        self
    }

    /// Append verbatim command text. No validation; also used for comments.
    pub fn add_command(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Operation::RawCommand(text.into()))
    }

    /// Append an empty line for readability. Semantically a no-op command.
    pub fn add_newline(&mut self) -> &mut Self {
        self.push(Operation::RawCommand(String::new()))
    }

    pub fn add_package(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Operation::InstallPackage(name.into()))
    }

    pub fn remove_package(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Operation::RemovePackage(name.into()))
    }

    pub fn enable_repo(&mut self, id: impl Into<String>) -> &mut Self {
        self.push(Operation::EnableRepository(id.into()))
    }

    pub fn disable_repo(&mut self, id: impl Into<String>) -> &mut Self {
        self.push(Operation::DisableRepository(id.into()))
    }

    pub fn enable_service(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Operation::EnableService(name.into()))
    }

    pub fn disable_service(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Operation::DisableService(name.into()))
    }

    pub fn start_service(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Operation::StartService(name.into()))
    }

    pub fn stop_service(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(Operation::StopService(name.into()))
    }

    /// Idempotently append `line` to `path`, keyed on `match_key`.
    ///
    /// The guard is evaluated when the script runs on the target, so the
    /// builder never inspects the real filesystem.
    pub fn add_line_to_file(
        &mut self,
        path: impl Into<String>,
        match_key: impl Into<String>,
        line: impl Into<String>,
    ) -> &mut Self {
        self.push(Operation::EnsureLineInFile {
            path: path.into(),
            match_key: match_key.into(),
            line: line.into(),
        })
    }

    /// Materialize `path` with `content`, rewriting only when the content
    /// checksum differs from what is on disk. Callers render templated
    /// content with `format!` before passing it in.
    pub fn add_file_template(
        &mut self,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> &mut Self {
        self.push(Operation::MaterializeFileIfChanged {
            path: path.into(),
            content: content.into(),
        })
    }

    /// Delete every line matching `key` from `path`. Safe when absent.
    pub fn remove_line_with_key(
        &mut self,
        path: impl Into<String>,
        key: impl Into<String>,
    ) -> &mut Self {
        self.push(Operation::RemoveLineWithKey {
            path: path.into(),
            key: key.into(),
        })
    }

    /// The ordered command list, without joining. For backends that execute
    /// commands individually rather than as one script.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Number of accumulated commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Render the full script: interpreter directive, then every command in
    /// insertion order, newline-joined.
    pub fn render(&self) -> String {
        let mut out = String::from(SCRIPT_HEADER);
        for cmd in &self.commands {
            out.push('\n');
            out.push_str(cmd);
        }
        out
    }
}

impl std::fmt::Display for ScriptBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}
