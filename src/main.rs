//! CLI entry point for hostfetch.

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hostfetch::config::ConfigError;
use hostfetch::parser::parse_url_line;
use hostfetch::pipeline::{log_cache_summary, open_cache};
use hostfetch::resolver::{ResolverPool, SystemLookup, warm_cache};
use hostfetch::{DownloaderConfig, HostSampler, HttpsPolicy, LineSink};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

mod app_config;
mod cli;

use app_config::FileConfig;
use cli::{Args, Command, DownloadArgs, ResolveArgs, ResolverFlags, SampleArgs};

/// In-flight resolutions per resolver worker during a cache warm-up.
const WARM_REQUESTS_PER_WORKER: usize = 4;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let file = app_config::load_file_config(args.config.as_deref())?;
    debug!(?file, "file config loaded");

    match args.command {
        Some(Command::Resolve(resolve)) => run_resolve(&resolve, &file).await,
        Some(Command::Sample(sample)) => run_sample(&sample).await,
        None => run_download(&args.download, &file).await,
    }
}

async fn run_download(download: &DownloadArgs, file: &FileConfig) -> Result<()> {
    let config = download_config(download, file);
    info!(
        resolvers = config.resolver_workers,
        https = ?config.https_policy,
        "hostfetch starting"
    );

    let input = open_input(&download.urls).await?;
    let mut sink = LineSink::new(io::stdout());
    let outcome = hostfetch::run(&config, Arc::new(SystemLookup), input, &mut sink).await?;

    if sink.failed_writes() > 0 {
        warn!(lines = sink.failed_writes(), "some results could not be written");
    }
    info!(
        routed = outcome.jobs.routed,
        completed = outcome.jobs.completed(),
        ok = outcome.jobs.succeeded,
        "download complete"
    );
    Ok(())
}

async fn run_resolve(resolve: &ResolveArgs, file: &FileConfig) -> Result<()> {
    let config = resolver_config(&resolve.resolver, file, DownloaderConfig::default());
    config.validate()?;
    let Some(snapshot) = config.snapshot_path.clone() else {
        bail!("resolve needs --cache PATH (or `cache` in the config file)");
    };

    let cache = Arc::new(open_cache(&config)?);
    if resolve.retry_failed {
        let forgotten = cache.forget_failures();
        info!(forgotten, "cached failures cleared for retry");
    }

    let mut hosts = Vec::new();
    let mut lines = open_input(&resolve.urls).await?.lines();
    while let Some(line) = lines.next_line().await.context("error reading input")? {
        match parse_url_line(&line) {
            Ok(Some(parsed)) => hosts.push(parsed.host().to_string()),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "skipping malformed line"),
        }
    }

    let pool = ResolverPool::spawn(Arc::clone(&cache), Arc::new(SystemLookup), config.resolver());
    let summary = warm_cache(
        &pool.handle(),
        hosts,
        config.resolver_workers * WARM_REQUESTS_PER_WORKER,
    )
    .await;
    pool.shutdown().await;

    info!(
        hosts = summary.hosts,
        resolved = summary.resolved,
        failed = summary.failed,
        "warm-up complete"
    );
    log_cache_summary("final", &cache);
    cache.save_snapshot(&snapshot).map_err(ConfigError::from)?;
    Ok(())
}

async fn run_sample(sample: &SampleArgs) -> Result<()> {
    let mut sampler = HostSampler::new(usize::try_from(sample.k).context("sample size too large")?);
    let mut lines = open_input(&sample.urls).await?.lines();
    while let Some(line) = lines.next_line().await.context("error reading input")? {
        if !sampler.check_in(&line) && !line.trim().is_empty() {
            debug!(line = %line, "not a url");
        }
    }
    for (_, picks) in sampler.samples() {
        for url in picks {
            println!("{url}");
        }
    }
    info!(hosts = sampler.host_count(), "sampled hosts");
    Ok(())
}

async fn open_input(path: &Path) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|source| ConfigError::Input {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Box::new(BufReader::new(file)))
}

/// Layers CLI flags over file values over defaults.
fn download_config(download: &DownloadArgs, file: &FileConfig) -> DownloaderConfig {
    let mut config = resolver_config(&download.resolver, file, DownloaderConfig::default());
    if let Some(secs) = download.connect_timeout_secs.or(file.connect_timeout_secs) {
        config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = download.read_timeout_secs.or(file.read_timeout_secs) {
        config.read_timeout = Duration::from_secs(secs);
    }
    if download.skip_https || file.skip_https == Some(true) {
        config.https_policy = HttpsPolicy::Skip;
    }
    config
}

fn resolver_config(
    flags: &ResolverFlags,
    file: &FileConfig,
    mut config: DownloaderConfig,
) -> DownloaderConfig {
    if let Some(n) = flags.resolvers.map(usize::from).or(file.resolvers) {
        config.resolver_workers = n;
    }
    if let Some(secs) = flags.resolve_timeout_secs.or(file.resolve_timeout_secs) {
        config.resolve_timeout = Duration::from_secs(secs);
    }
    config.snapshot_path = flags.cache.clone().or_else(|| file.cache.clone());
    config
}
