mod cmd_status;
mod cmd_sync;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use time::UtcOffset;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "glsync",
    version,
    about = "Replay your GitLab activity as dated commits in a local repository"
)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch new activity and record it as commits
    Sync(cmd_sync::SyncArgs),
    /// Show the checkpoint and recorded days of a target directory
    Status {
        /// Git working tree receiving the records
        #[arg(long, env = "GL_TARGET_SYNC_REPO")]
        target: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Must be read before any other thread exists.
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let dotenv = match std::env::current_dir() {
        Ok(dir) => load_dotenv(&dir)?,
        Err(_) => None,
    };
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    match cli.cmd {
        Command::Sync(args) => cmd_sync::execute(args, local_offset),
        Command::Status { target } => cmd_status::execute(&target, local_offset),
    }
}

/// Load `.env` from `dir` or the nearest ancestor holding one, so
/// `GL_API_TOKEN` and friends can live in a file. Variables already set in
/// the process environment take precedence over the file.
fn load_dotenv(dir: &Path) -> anyhow::Result<Option<PathBuf>> {
    let Some(path) = dir.ancestors().map(|d| d.join(".env")).find(|p| p.is_file()) else {
        return Ok(None);
    };
    dotenvy::from_path(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Some(path))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
