//! Command-line interface for the hpcforge engine.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;

use crate::os_identity::{Distro, PlatformTag};

/// hpcforge - declarative configuration-script engine for HPC clusters
#[derive(Parser)]
#[command(name = "hpcforge")]
#[command(about = "Generate and apply idempotent configuration scripts for HPC cluster nodes")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: log what would be executed without making changes.
    ///
    /// Commands are printed through the logging layer and reported as
    /// successful; nothing is spawned.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render the converge script for a plan without executing it
    Render {
        /// Path to the plan file (JSON)
        #[arg(short, long)]
        plan: PathBuf,

        /// Write the script here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Apply a plan to this machine through the selected backend
    Apply {
        /// Path to the plan file (JSON)
        #[arg(short, long)]
        plan: PathBuf,
    },
    /// Validate a plan file
    Validate {
        /// Path to the plan file to validate
        plan: PathBuf,
    },
    /// Inspect and manage the repository registry
    ///
    /// The registry is seeded fresh from the distro defaults on every run.
    /// Changes are shown as a preview and discarded unless --save writes the
    /// resulting state to a definition file.
    Repos {
        /// Target distribution
        #[arg(long, default_value = "rocky", value_parser = parse_distro)]
        distro: Distro,

        /// Target platform tag
        #[arg(long, default_value = "el9", value_parser = parse_platform)]
        platform: PlatformTag,

        /// Write the resulting registry state to this .repo file
        #[arg(long, global = true)]
        save: Option<PathBuf>,

        #[command(subcommand)]
        repo_command: RepoCommands,
    },
}

#[derive(Subcommand)]
pub enum RepoCommands {
    /// List the registry contents
    List,
    /// Enable repositories by id
    Enable {
        /// Repository ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Disable repositories by id
    Disable {
        /// Repository ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Register repositories from a definition file
    Install {
        /// Path to a .repo definition file
        file: PathBuf,
    },
}

fn parse_distro(s: &str) -> Result<Distro, String> {
    Distro::from_str(s).map_err(|_| format!("unknown distro: {} (rocky, alma, rhel)", s))
}

fn parse_platform(s: &str) -> Result<PlatformTag, String> {
    PlatformTag::from_str(s).map_err(|_| format!("unknown platform tag: {} (el7, el8, el9)", s))
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_render() {
        let cli = Cli::try_parse_from(["hpcforge", "render", "--plan", "node.json"]).unwrap();
        assert!(!cli.dry_run);
        assert!(matches!(cli.command, Commands::Render { .. }));
    }

    #[test]
    fn test_global_dry_run_after_subcommand() {
        let cli =
            Cli::try_parse_from(["hpcforge", "apply", "--plan", "node.json", "--dry-run"]).unwrap();
        assert!(cli.dry_run);
    }

    #[test]
    fn test_repos_enable_requires_ids() {
        assert!(Cli::try_parse_from(["hpcforge", "repos", "enable"]).is_err());
        let cli = Cli::try_parse_from(["hpcforge", "repos", "enable", "epel", "crb"]).unwrap();
        match cli.command {
            Commands::Repos { repo_command: RepoCommands::Enable { ids }, .. } => {
                assert_eq!(ids, vec!["epel", "crb"]);
            }
            _ => panic!("expected repos enable"),
        }
    }

    #[test]
    fn test_repos_save_is_global_to_repo_subcommands() {
        let cli = Cli::try_parse_from([
            "hpcforge", "repos", "enable", "epel", "--save", "/tmp/out.repo",
        ])
        .unwrap();
        match cli.command {
            Commands::Repos { save, .. } => {
                assert_eq!(save, Some(PathBuf::from("/tmp/out.repo")));
            }
            _ => panic!("expected repos"),
        }

        let cli = Cli::try_parse_from(["hpcforge", "repos", "list"]).unwrap();
        match cli.command {
            Commands::Repos { save, .. } => assert!(save.is_none()),
            _ => panic!("expected repos"),
        }
    }

    #[test]
    fn test_repos_distro_parsing() {
        let cli = Cli::try_parse_from([
            "hpcforge", "repos", "--distro", "alma", "--platform", "el8", "list",
        ])
        .unwrap();
        match cli.command {
            Commands::Repos { distro, platform, .. } => {
                assert_eq!(distro, Distro::Alma);
                assert_eq!(platform, PlatformTag::El8);
            }
            _ => panic!("expected repos"),
        }
    }
}
