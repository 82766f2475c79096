//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Download URL lists fast, one request per host at a time.
///
/// Every connection resolves its host through a shared resolution cache that
/// can be persisted between runs with `--cache`.
#[derive(Parser, Debug)]
#[command(name = "hostfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/hostfetch/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub download: DownloadArgs,
}

/// Subcommands besides the default download run.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve every host of a URL list into the cache snapshot
    Resolve(ResolveArgs),
    /// Print up to K random URLs for each host seen at least K times
    Sample(SampleArgs),
}

/// Flags for the default download run.
#[derive(ClapArgs, Debug)]
pub struct DownloadArgs {
    /// URL list, one per line (`-` for stdin)
    #[arg(long, value_name = "PATH", default_value = "urls.txt")]
    pub urls: PathBuf,

    #[command(flatten)]
    pub resolver: ResolverFlags,

    /// Skip https URLs instead of downloading them
    #[arg(long)]
    pub skip_https: bool,

    /// HTTP connect timeout in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub connect_timeout_secs: Option<u64>,

    /// HTTP request timeout in seconds, body included (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub read_timeout_secs: Option<u64>,
}

/// Resolver flags shared by the download run and `resolve`.
#[derive(ClapArgs, Debug)]
pub struct ResolverFlags {
    /// Resolver pool size (1-64, default 4)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..=64))]
    pub resolvers: Option<u16>,

    /// Resolution cache snapshot, loaded at start and saved at the end
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Deadline for one host resolution in seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub resolve_timeout_secs: Option<u64>,
}

/// Flags for `resolve`.
#[derive(ClapArgs, Debug)]
pub struct ResolveArgs {
    /// URL list whose hosts are resolved (`-` for stdin)
    #[arg(long, value_name = "PATH", default_value = "urls.txt")]
    pub urls: PathBuf,

    #[command(flatten)]
    pub resolver: ResolverFlags,

    /// Forget cached failures so they are looked up again
    #[arg(long)]
    pub retry_failed: bool,
}

/// Flags for `sample`.
#[derive(ClapArgs, Debug)]
pub struct SampleArgs {
    /// URL list to sample (`-` for stdin)
    #[arg(long, value_name = "PATH", default_value = "urls.txt")]
    pub urls: PathBuf,

    /// Samples per host
    #[arg(short, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub k: u32,
}
