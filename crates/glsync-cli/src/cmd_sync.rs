use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use time::macros::format_description;
use time::UtcOffset;

use glsync_core::config::DEFAULT_API_URL;
use glsync_core::{BackoffStrategy, LocalZone, RetrySettings, SyncConfig};
use glsync_feed::GitLabClient;
use glsync_store::SyncPaths;
use glsync_sync::{GitCli, Materializer, SyncEngine};

// ── CLI Schema ──

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// GitLab personal access token
    #[arg(long, env = "GL_API_TOKEN", hide_env_values = true)]
    token: String,
    /// Git working tree receiving the records
    #[arg(long, env = "GL_TARGET_SYNC_REPO")]
    target: PathBuf,
    /// GitLab REST API base URL
    #[arg(long, env = "GL_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,
    /// Pause after each page of events, in milliseconds
    #[arg(long, default_value_t = 500)]
    pacing_ms: u64,
    /// Per-request timeout, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Attempts per request before giving up (1 disables retry)
    #[arg(long, default_value_t = 4)]
    max_attempts: u32,
    /// Delay before the first retry, in milliseconds
    #[arg(long, default_value_t = 500)]
    retry_base_ms: u64,
    /// Growth of the retry delay: none, linear or exponential
    #[arg(long, default_value = "exponential")]
    backoff: BackoffStrategy,
    /// Fixed offset for daily file names and record lines, e.g. +02:00
    /// (default: the system zone at each recorded instant)
    #[arg(long)]
    utc_offset: Option<String>,
}

// ── Command Implementation ──

pub fn execute(args: SyncArgs, system_offset: UtcOffset) -> anyhow::Result<()> {
    let config = build_config(args, system_offset)?;
    config.validate()?;

    let paths = SyncPaths::discover(&config.target_dir);
    let git = GitCli::new(&config.target_dir);
    let client = GitLabClient::new(&config);
    let materializer = Materializer::new(paths, &git, config.local_zone)
        .context("loading checkpoint")?;

    tracing::info!(target_dir = %git.repo_dir().display(), api = %config.api_url, "syncing");
    let report = SyncEngine::new(&client, materializer, config.pacing)
        .run()
        .context("sync aborted; rerun to resume from the last recorded event")?;

    println!(
        "Recorded {} unit(s) from {} event(s) over {} page(s); {} already recorded, {} event(s) not handled.",
        report.units, report.events, report.pages, report.skipped, report.unhandled
    );
    Ok(())
}

fn build_config(args: SyncArgs, system_offset: UtcOffset) -> anyhow::Result<SyncConfig> {
    let local_zone = match args.utc_offset.as_deref() {
        Some(s) => LocalZone::Fixed(parse_offset(s)?),
        None => LocalZone::System {
            fallback: system_offset,
        },
    };
    let mut config = SyncConfig::new(args.token, args.target);
    config.api_url = args.api_url;
    config.pacing = Duration::from_millis(args.pacing_ms);
    config.request_timeout = Duration::from_secs(args.timeout_secs);
    config.retry = RetrySettings {
        max_attempts: args.max_attempts,
        base_delay: Duration::from_millis(args.retry_base_ms),
        strategy: args.backoff,
        ..RetrySettings::default()
    };
    config.local_zone = local_zone;
    Ok(config)
}

fn parse_offset(s: &str) -> anyhow::Result<UtcOffset> {
    let fmt = format_description!("[offset_hour sign:mandatory]:[offset_minute]");
    UtcOffset::parse(s.trim(), &fmt)
        .with_context(|| format!("invalid --utc-offset {s:?}, expected e.g. +02:00"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use time::macros::offset;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: SyncArgs,
    }

    fn parse(argv: &[&str]) -> SyncArgs {
        let mut full = vec!["glsync"];
        full.extend_from_slice(argv);
        TestCli::try_parse_from(full).unwrap().args
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(parse_offset("+02:00").unwrap(), offset!(+2));
        assert_eq!(parse_offset("-05:30").unwrap(), offset!(-5:30));
        assert!(parse_offset("CET").is_err());
    }

    #[test]
    fn flags_build_config() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().to_str().unwrap();
        let args = parse(&[
            "--token",
            "glpat-abc",
            "--target",
            target,
            "--api-url",
            "https://gitlab.example.com/api/v4",
            "--pacing-ms",
            "0",
            "--max-attempts",
            "2",
            "--backoff",
            "linear",
            "--utc-offset",
            "+01:00",
        ]);
        let config = build_config(args, UtcOffset::UTC).unwrap();
        assert_eq!(config.api_token, "glpat-abc");
        assert_eq!(config.api_url, "https://gitlab.example.com/api/v4");
        assert_eq!(config.pacing, Duration::ZERO);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.retry.strategy, BackoffStrategy::Linear);
        assert_eq!(config.local_zone, LocalZone::Fixed(offset!(+1)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn system_zone_is_the_default() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().to_str().unwrap();
        let args = parse(&["--token", "t", "--target", target]);
        let config = build_config(args, offset!(+9)).unwrap();
        assert_eq!(
            config.local_zone,
            LocalZone::System {
                fallback: offset!(+9)
            }
        );
        assert_eq!(config.retry.strategy, BackoffStrategy::Exponential);
    }

    #[test]
    fn unknown_backoff_is_rejected() {
        let result = TestCli::try_parse_from([
            "glsync", "--token", "t", "--target", "/tmp", "--backoff", "random",
        ]);
        assert!(result.is_err());
    }
}
