use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::{Duration, Local};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::warn;

use rental_scraper::config::{ProxySettings, ScraperConfig};
use rental_scraper::crawl;
use rental_scraper::fetch::REQUEST_TIMEOUT;

#[derive(Parser)]
#[command(name = "rental_scraper", about = "Paginated rental-listing crawler")]
struct Cli {
    /// Region search-root URLs, one crawl task each
    domains: Vec<String>,

    /// File with one search-root URL per line (alternative to positionals)
    #[arg(long)]
    domains_file: Option<PathBuf>,

    /// Hours back from now the crawl window reaches
    #[arg(long, default_value_t = 2)]
    lookback: i64,

    /// Hours past now still accepted (bumped reposts carry future stamps)
    #[arg(long, default_value_t = 1)]
    lead: i64,

    /// Output directory
    #[arg(long, default_value = "./data")]
    out_dir: PathBuf,

    /// Output filename prefix
    #[arg(long, default_value = "data")]
    fname_base: String,

    /// Skip the run-timestamp suffix on output filenames
    #[arg(long)]
    no_fname_ts: bool,

    /// JSON file with the upstream proxy credential
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut domains = cli.domains.clone();
    if let Some(path) = &cli.domains_file {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read domains file {}", path.display()))?;
        domains.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
    }
    if domains.is_empty() {
        bail!("no domains given; pass search-root URLs or --domains-file");
    }

    let proxy = cli
        .settings
        .as_deref()
        .map(ProxySettings::load)
        .transpose()?;

    let now = Local::now().naive_local();
    let config = ScraperConfig {
        earliest_ts: now - Duration::hours(cli.lookback),
        latest_ts: now + Duration::hours(cli.lead),
        out_dir: cli.out_dir,
        fname_base: cli.fname_base,
        run_ts: if cli.no_fname_ts {
            String::new()
        } else {
            now.format("%Y%m%d-%H%M%S").to_string()
        },
        request_timeout: REQUEST_TIMEOUT,
        proxy,
    };
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("cannot create output dir {}", config.out_dir.display()))?;

    // One task per region; nothing is shared across them, each owns its
    // own client and output file.
    let bar = ProgressBar::new(domains.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} regions (eta {eta})")?
            .progress_chars("=> "),
    );

    let mut tasks = JoinSet::new();
    for domain in domains {
        let config = config.clone();
        tasks.spawn(async move { crawl::run_region(&config, &domain).await });
    }

    let mut total_rows = 0usize;
    let mut regions_ok = 0usize;
    let mut regions_failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        match joined? {
            Ok(stats) => {
                regions_ok += 1;
                total_rows += stats.rows_written;
            }
            Err(err) => {
                regions_failed += 1;
                warn!("region failed: {}", err);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!(
        "Done: {} rows across {} regions in {:.1}s ({} failed)",
        total_rows,
        regions_ok,
        t0.elapsed().as_secs_f64(),
        regions_failed
    );
    Ok(())
}
