//! hpcforge - main entry point
//!
//! Thin binary surface: parse arguments, pick the execution backend once,
//! and hand everything to the library.

use std::path::Path;

use log::{debug, info};

use hpcforge::cli::{Cli, Commands, RepoCommands};
use hpcforge::os_identity::{Architecture, OsIdentity, PlatformTag};
use hpcforge::plan::InstallPlan;
use hpcforge::repos::RepoRegistry;
use hpcforge::{installer, DryRunBackend, ExecutionBackend, LiveBackend};

/// Initialize the logger with appropriate settings
fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;

    Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env() // Allows RUST_LOG env var to override
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    // Backend is chosen once here and passed down; nothing below looks at
    // an ambient dry-run flag.
    let backend: Box<dyn ExecutionBackend> = if cli.dry_run {
        info!("dry-run mode: no commands will be executed");
        Box::new(DryRunBackend::new())
    } else {
        Box::new(LiveBackend::new())
    };

    match cli.command {
        Commands::Render { plan, output } => {
            let plan = InstallPlan::load_from_file(&plan)?;
            plan.validate()?;
            let script = installer::build_script(&plan)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, script.render())?;
                    info!("wrote script to {}", path.display());
                }
                None => println!("{}", script.render()),
            }
        }
        Commands::Apply { plan } => {
            let plan = InstallPlan::load_from_file(&plan)?;
            plan.validate()?;
            let result = installer::apply(&plan, backend.as_ref())?;
            info!(
                "apply finished via {} backend with exit code {}",
                result.backend_kind, result.exit_code
            );
            for line in &result.captured_lines {
                println!("{}", line);
            }
            if !result.success() {
                std::process::exit(result.exit_code);
            }
        }
        Commands::Validate { plan } => match InstallPlan::load_from_file(&plan) {
            Ok(loaded) => match loaded.validate() {
                Ok(()) => println!("✓ Plan file is valid: {}", plan.display()),
                Err(e) => {
                    eprintln!("✗ Plan file is invalid: {:#}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("✗ Failed to load plan: {:#}", e);
                std::process::exit(1);
            }
        },
        Commands::Repos {
            distro,
            platform,
            save,
            repo_command,
        } => {
            let major = match platform {
                PlatformTag::El7 => 7,
                PlatformTag::El8 => 8,
                PlatformTag::El9 => 9,
            };
            let os = OsIdentity::new(distro, platform, major, 0, Architecture::X86_64);
            let mut registry = RepoRegistry::new(os);
            registry.initialize_default_repositories();

            match repo_command {
                RepoCommands::List => print_repos(&registry),
                RepoCommands::Enable { ids } => {
                    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                    registry.enable_all(&ids)?;
                    print_repos(&registry);
                }
                RepoCommands::Disable { ids } => {
                    let ids: Vec<&str> = ids.iter().map(String::as_str).collect();
                    registry.disable_all(&ids)?;
                    print_repos(&registry);
                }
                RepoCommands::Install { file } => {
                    registry.install(Path::new(&file))?;
                    print_repos(&registry);
                }
            }

            // Without --save the registry above is a preview that ends with
            // the process.
            if let Some(path) = save {
                registry.save_to(&path)?;
                info!("wrote registry state to {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_repos(registry: &RepoRegistry) {
    for repo in registry.list_repos() {
        println!(
            "{:<12} {:<9} {}",
            repo.id,
            if repo.enabled { "enabled" } else { "disabled" },
            repo.name
        );
    }
}
