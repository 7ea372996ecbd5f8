//! Siteforge - CMS site provisioning
//!
//! Usage:
//!   siteforge install site.toml     # Provision a site from a profile
//!   siteforge profiles              # List available profiles
//!   siteforge registry list         # Show tenant host mappings

mod render;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siteforge_core::install::{InstallOptions, InstallPipeline, Services};
use siteforge_core::registry::{JsonTenantRegistry, TenantRegistryStore};
use siteforge_core::settings::{Settings, SettingsStore};
use siteforge_core::site::SiteSpecification;

use crate::render::{print_report, print_report_json};

#[derive(Parser)]
#[command(name = "siteforge")]
#[command(about = "Provision CMS sites from profile archives", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/siteforge/siteforge.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a site described by a TOML site file
    Install(InstallArgs),

    /// List profile archives available for installs
    Profiles,

    /// Manage the hostname to tenant-directory registry
    Registry(RegistryArgs),
}

#[derive(Args)]
struct InstallArgs {
    /// Site file describing the new site
    site: PathBuf,

    /// Restore the schema even if the database already has the core tables
    #[arg(long)]
    force_replace_schema: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    format: OutputFormat,
}

#[derive(Args)]
struct RegistryArgs {
    #[command(subcommand)]
    command: RegistrySubcommand,
}

#[derive(Subcommand)]
enum RegistrySubcommand {
    /// List host mappings
    List,

    /// Map a hostname to a tenant directory
    Add {
        /// Hostname, e.g. blog.example.com
        host: String,
        /// Tenant directory under the shared root, e.g. site-blog
        dir: String,
    },

    /// Remove every hostname mapped to a tenant directory
    Remove {
        /// Tenant directory, e.g. site-blog
        dir: String,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable notices
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siteforge=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Install(args) => run_install(settings, args),
        Commands::Profiles => run_profiles(&settings),
        Commands::Registry(args) => run_registry(&settings, args),
    }
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let store = match path {
        Some(path) => SettingsStore::new(path),
        None => SettingsStore::from_default_location()?,
    };
    tracing::debug!("loading settings from {}", store.path().display());
    store.load()
}

fn run_install(settings: Settings, args: InstallArgs) -> Result<()> {
    let spec = SiteSpecification::from_path(&args.site)?;
    spec.validate()?;

    let services = Services::production(&settings).context("Failed to initialize services")?;
    let pipeline = InstallPipeline::new(settings, services);
    let options = InstallOptions {
        force_replace_schema: args.force_replace_schema,
    };

    let report = pipeline.run(&spec, &options);
    match args.format {
        OutputFormat::Table => print_report(&report),
        OutputFormat::Json => print_report_json(&report)?,
    }

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_profiles(settings: &Settings) -> Result<()> {
    let dir = settings.profiles_path();
    if !dir.is_dir() {
        println!("No profiles directory at {}", dir.display());
        return Ok(());
    }

    let mut profiles: Vec<String> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to read profiles directory: {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "zip"))
        .filter_map(|path| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
        })
        .collect();
    profiles.sort();

    if profiles.is_empty() {
        println!("No profiles in {}", dir.display());
    }
    for profile in profiles {
        println!("{profile}");
    }
    Ok(())
}

fn run_registry(settings: &Settings, args: RegistryArgs) -> Result<()> {
    let registry = JsonTenantRegistry::new(settings.registry_path());
    match args.command {
        RegistrySubcommand::List => {
            let map = registry.load()?;
            if map.is_empty() {
                println!("No tenants registered in {}", registry.path().display());
            }
            for (host, dir) in map {
                println!("{host} -> {dir}");
            }
        }
        RegistrySubcommand::Add { host, dir } => {
            registry.add(&host, &dir)?;
            println!("Registered {host} -> {dir}");
        }
        RegistrySubcommand::Remove { dir } => {
            let removed = registry.remove(&dir)?;
            if removed.is_empty() {
                println!("No hosts mapped to {dir}");
            } else {
                println!("Removed {}", removed.join(", "));
            }
        }
    }
    Ok(())
}
