use anyhow::Result;
use clap::Parser;
use pkgsync::config::Config;
use pkgsync::latch::{LifecycleEvent, SYNC_LATCH};
use pkgsync::report::CausePolicy;
use std::path::PathBuf;

/// pkgsync - keep the package registry in step with the dependency manager
///
/// Registers packages the dependency manager installed, re-registers the ones
/// that moved, and drops the ones it removed. Packages registered by anything
/// else are never touched.
///
/// Examples:
///   pkgsync sync                         # Reconcile once
///   pkgsync hook post-install post-update # Called from the dependency manager
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGSYNC_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to the current directory; also via PKGSYNC_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "PKGSYNC_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Config file replacing the global and project config files
    #[arg(
        long = "config",
        short = 'c',
        env = "PKGSYNC_CONFIG",
        value_name = "FILE",
        global = true
    )]
    pub config: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Reconcile the registry with the installed packages
    Sync(SyncArgs),

    /// Handle lifecycle notifications; reconciles at most once per invocation
    Hook(HookArgs),

    /// List registered packages and report load errors
    Status(StatusArgs),
}

#[derive(clap::Args, Debug)]
pub struct SyncArgs {
    /// Print the planned changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// Show every recorded cause instead of only the first
    #[arg(long)]
    pub all_causes: bool,
}

#[derive(clap::Args, Debug)]
pub struct HookArgs {
    /// Lifecycle events, in the order they were delivered
    #[arg(value_enum, required = true, value_name = "EVENT")]
    pub events: Vec<LifecycleEvent>,
}

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Show every recorded cause instead of only the first
    #[arg(long)]
    pub all_causes: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let runtime = pkgsync::runtime::RealRuntime;

    let mut config = Config::load(&runtime, cli.root, cli.config.as_deref())?;

    match cli.command {
        Commands::Sync(args) => {
            if args.all_causes {
                config.cause_policy = CausePolicy::All;
            }
            pkgsync::commands::sync(&runtime, &config, args.dry_run)?;
        }
        Commands::Hook(args) => {
            pkgsync::commands::hook(&runtime, &config, &SYNC_LATCH, &args.events)?;
        }
        Commands::Status(args) => {
            if args.all_causes {
                config.cause_policy = CausePolicy::All;
            }
            pkgsync::commands::status(&runtime, &config)?;
        }
    }
    Ok(())
}
