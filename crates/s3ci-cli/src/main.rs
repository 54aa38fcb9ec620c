//! 🚀 s3ci-cli: the front door, the bouncer, the maitre d' of s3ci.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that parses args, sets up logging,
//! loads config, and then lets the library do the heavy lifting. Like a manager. 🦆
//!
//! Stdout gets exactly one line on success: the binary path (or the key name for
//! `find-package`). Everything else, logs and progress bars included, goes to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use s3ci::ResolveError;
use s3ci::logging::LogConfig;
use tracing::error;

/// 🪣 Retrieve CI build artifacts from the QA bucket.
#[derive(Parser, Debug)]
#[command(name = "s3ci", version, about)]
struct Cli {
    /// Optional TOML settings file (bucket, region, endpoint_url, namespace, [naming])
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve and extract juju binaries.
    #[command(name = "get-juju-bin")]
    GetJujuBin(GetJujuBinArgs),
    /// Print the key that get-juju-bin would download, without downloading it.
    #[command(name = "find-package")]
    FindPackage(FindPackageArgs),
    #[command(external_subcommand)]
    External(Vec<String>),
}

#[derive(Args, Debug)]
struct GetJujuBinArgs {
    /// s3cmd-style credentials file
    config: PathBuf,
    /// Revision build number
    revision_build: u64,
    /// Where to download and extract
    #[arg(default_value = ".")]
    workspace: PathBuf,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Debug)]
struct FindPackageArgs {
    /// s3cmd-style credentials file
    config: PathBuf,
    /// Revision build number
    revision_build: u64,
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Command {
    fn verbosity(&self) -> u8 {
        match self {
            Command::GetJujuBin(args) => args.verbose,
            Command::FindPackage(args) => args.verbose,
            Command::External(_) => 0,
        }
    }
}

/// 🚀 main(): where it all begins. The genesis. The big bang.
///
/// 🔧 Steps:
/// 1. Parse args (clap exits with usage on nonsense)
/// 2. Init tracing at the requested verbosity
/// 3. Load config (the moment of truth)
/// 4. Run the subcommand (send it and pray 🙏)
/// 5. Handle errors (cry, then exit 1)
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    LogConfig::from_verbosity(cli.command.verbosity()).init()?;

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one tear-jerking layer at a time
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
        }
        if let Some(hint) = err.chain().find_map(|cause| cause.downcast_ref::<ResolveError>()).and_then(hint_for) {
            error!("🔧 hint: {}", hint);
        }
        // 🗑️ Exit with prejudice. Process exitus maximus.
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // 🔒 Validate the settings file exists before we get too emotionally attached
    if let Some(settings) = &cli.settings {
        let it_exists = settings.try_exists().with_context(|| {
            format!("💀 Couldn't check whether '{}' exists.", settings.display())
        })?;
        anyhow::ensure!(
            it_exists,
            "💀 Settings file '{}' does not exist. Relative paths are relative to the cwd, not to your hopes.",
            settings.display()
        );
    }

    let app_config = s3ci::app_config::load_config(cli.settings.as_deref())
        .context("💀 In s3ci-cli, main, we couldn't load the settings")?;

    match cli.command {
        Command::GetJujuBin(args) => {
            let the_binary =
                s3ci::get_juju_bin(&app_config, &args.config, args.revision_build, &args.workspace)
                    .await
                    .with_context(|| {
                        format!("💀 get-juju-bin failed for revision build {}", args.revision_build)
                    })?;
            println!("{}", the_binary.display());
        }
        Command::FindPackage(args) => {
            let the_key = s3ci::find_package(&app_config, &args.config, args.revision_build)
                .await
                .with_context(|| {
                    format!("💀 find-package failed for revision build {}", args.revision_build)
                })?;
            println!("{}", the_key);
        }
        Command::External(words) => {
            let command = words.first().cloned().unwrap_or_default();
            return Err(ResolveError::NotImplemented { command }.into());
        }
    }

    Ok(())
}

/// 🔧 A sentence of advice for the errors that have an obvious next step.
fn hint_for(err: &ResolveError) -> Option<&'static str> {
    match err {
        ResolveError::PackageNotFound { .. } => Some(
            "the build may still be running, or it never produced a package for this series/arch. \
             Check [naming] in the settings, or try again later.",
        ),
        ResolveError::Credential { .. } => Some(
            "the credentials file needs a [default] section with access_key and secret_key.",
        ),
        ResolveError::Workspace { .. } => Some(
            "the workspace has to be a directory we can create and write to.",
        ),
        ResolveError::Transport { .. } => Some(
            "looks like the bucket isn't reachable, or won't talk to us. \
             Double-check the region, endpoint_url and the keys' permissions.",
        ),
        _ => None,
    }
}
