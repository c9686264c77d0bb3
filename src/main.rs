//! AppRole Reaper
//!
//! Finds vault-approle-slides-app-qa and vault-approle-monocle-staging IAM
//! users older than the retention window and deletes them, along with their
//! access key and policy attachment.
//!
//! # Usage
//! ```bash
//! # Preview what would be deleted
//! approle-reaper --dry-run
//!
//! # Most cautious real run: only users whose key was never used
//! approle-reaper --only-never-used
//!
//! # One family, one week of retention, JSON summary
//! approle-reaper --family slides-app-qa --retention-days 7 --output json
//! ```
//!
//! `--all-families` considers every IAM user regardless of name. It is only
//! accepted together with `--only-never-used`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use approle_reaper::config::{DEFAULT_PAGE_SIZE, DEFAULT_RETENTION_DAYS};
use approle_reaper::families;
use approle_reaper::{ExecutionMode, FamilyKind, IamDirectory, Reaper, RunConfig, Scope, UsageFilter};

/// Exit status when the configuration is refused
const EXIT_REFUSED: u8 = 2;

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser, Debug)]
#[command(name = "approle-reaper", version)]
#[command(about = "Delete stale Vault AppRole IAM users", long_about = None)]
struct Cli {
    /// Only consider users older than this many days
    #[arg(long, default_value_t = DEFAULT_RETENTION_DAYS, env = "REAPER_RETENTION_DAYS")]
    retention_days: u32,

    /// Users requested per ListUsers call
    #[arg(
        long,
        default_value_t = DEFAULT_PAGE_SIZE,
        env = "REAPER_PAGE_SIZE",
        value_parser = clap::value_parser!(i32).range(1..=1000)
    )]
    page_size: i32,

    /// Family to process (repeatable, default: all)
    #[arg(long, value_enum)]
    family: Vec<FamilyKind>,

    /// Consider every IAM user, not just the AppRole families
    #[arg(long)]
    all_families: bool,

    /// Skip users whose access key has ever been used
    #[arg(long)]
    only_never_used: bool,

    /// Report what would be deleted without deleting anything
    #[arg(long)]
    dry_run: bool,

    /// AWS shared-config profile
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// AWS region for the IAM client
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Summary format on stdout
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Log format on stderr
    #[arg(long, value_enum, default_value = "text")]
    log_format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig::new()
            .retention_days(self.retention_days)
            .page_size(self.page_size)
            .scope(if self.all_families {
                Scope::AllAccounts
            } else {
                Scope::Family
            })
            .usage(if self.only_never_used {
                UsageFilter::NeverUsedOnly
            } else {
                UsageFilter::Any
            })
            .mode(if self.dry_run {
                ExecutionMode::Simulate
            } else {
                ExecutionMode::Execute
            })
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match cli.log_format {
        OutputFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        OutputFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }
    Ok(())
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = cli.run_config();
    if let Err(err) = config.validate() {
        warn!("⚠️  {}", err);
        return Ok(ExitCode::from(EXIT_REFUSED));
    }

    info!(
        retention_days = config.retention_days,
        mode = %config.mode,
        "🚀 AppRole Reaper starting..."
    );

    let directory = IamDirectory::from_env(cli.profile.as_deref(), cli.region.as_deref()).await;
    let selected = families::select(&cli.family);
    let reaper = Reaper::new(directory, config);

    let reports = reaper
        .run(&selected)
        .await
        .context("Failed to reap AppRole users")?;

    match cli.output {
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", report.display());
            }
            if reaper.config().is_simulation() {
                println!("Dry run: no users were deleted");
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&reports).context("Failed to serialize reports")?
            );
        }
    }

    info!("✅ Done");
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["approle-reaper"]).unwrap();
        let config = cli.run_config();

        assert_eq!(config.retention_days, 3);
        assert_eq!(config.page_size, 1000);
        assert_eq!(config.scope, Scope::Family);
        assert_eq!(config.usage, UsageFilter::Any);
        assert_eq!(config.mode, ExecutionMode::Execute);
        assert!(cli.family.is_empty());
    }

    #[test]
    fn test_flags_map_to_config() {
        let cli = Cli::try_parse_from([
            "approle-reaper",
            "--dry-run",
            "--only-never-used",
            "--retention-days",
            "7",
            "--family",
            "monocle-staging",
        ])
        .unwrap();
        let config = cli.run_config();

        assert!(config.is_simulation());
        assert_eq!(config.usage, UsageFilter::NeverUsedOnly);
        assert_eq!(config.retention_days, 7);
        assert_eq!(cli.family, vec![FamilyKind::MonocleStaging]);
    }

    #[test]
    fn test_all_families_without_never_used_is_refused() {
        let cli = Cli::try_parse_from(["approle-reaper", "--all-families"]).unwrap();
        assert!(cli.run_config().validate().is_err());

        let cli =
            Cli::try_parse_from(["approle-reaper", "--all-families", "--only-never-used"]).unwrap();
        assert!(cli.run_config().validate().is_ok());
    }

    #[test]
    fn test_page_size_range() {
        assert!(Cli::try_parse_from(["approle-reaper", "--page-size", "0"]).is_err());
        assert!(Cli::try_parse_from(["approle-reaper", "--page-size", "1001"]).is_err());
    }
}
