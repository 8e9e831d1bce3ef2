//! asnping - find a pingable address for each of a list of ASNs.
//!
//! This is the command-line interface for the asnping library.

#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Result};
use asnping::socket::utils::{available_icmp_mode, is_root};
use asnping::{
    parse_asn_list, AsnOutcome, Discoverer, DiscoveryConfig, DiscoveryReport, Services,
};
use clap::Parser;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Get the version string for asnping
fn get_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(env!("CARGO_PKG_VERSION"), "-UNRELEASED")
    } else {
        env!("CARGO_PKG_VERSION")
    }
}

/// Command-line arguments for the discovery tool.
#[derive(Parser, Debug)]
#[clap(author, version, about = "Find a live, pingable IP address inside each ASN", long_about = None)]
struct Args {
    /// ASN or comma-separated list of ASNs (e.g. 13335 or AS13335,15169)
    #[clap(long)]
    asn: String,

    /// Timeout for individual echo probes in milliseconds
    #[clap(long, default_value_t = asnping::config::DEFAULT_PROBE_TIMEOUT_MS)]
    probe_timeout_ms: u64,

    /// Number of addresses probed concurrently while sweeping a prefix
    #[clap(short = 'b', long, default_value_t = asnping::config::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Only consider prefixes announced within this many hours
    #[clap(long, default_value_t = asnping::config::DEFAULT_LOOKBACK_HOURS)]
    lookback_hours: u64,

    /// Minimum number of RIS peers that must see a prefix
    #[clap(long, default_value_t = asnping::config::DEFAULT_MIN_PEERS)]
    min_peers: u32,

    /// Timeout for upstream HTTP requests in milliseconds
    #[clap(long, default_value_t = asnping::config::DEFAULT_HTTP_TIMEOUT_MS)]
    http_timeout_ms: u64,

    /// Output results in JSON format
    #[clap(long)]
    json: bool,

    /// Enable verbose output (use -vv for trace output)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn to_config(&self) -> Result<DiscoveryConfig> {
        DiscoveryConfig::builder()
            .probe_timeout(Duration::from_millis(self.probe_timeout_ms))
            .batch_size(self.batch_size)
            .lookback(Duration::from_secs(self.lookback_hours.saturating_mul(3600)))
            .min_peers(self.min_peers)
            .http_timeout(Duration::from_millis(self.http_timeout_ms))
            .build()
            .map_err(|e| anyhow!(e))
    }
}

/// Accept the single-dash `-asn` spelling alongside `--asn`
fn normalize_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    args.into_iter()
        .map(|arg| match arg.strip_prefix("-asn") {
            Some(rest) if rest.is_empty() || rest.starts_with('=') => format!("--asn{rest}"),
            _ => arg,
        })
        .collect()
}

/// Default log filter for a verbosity count
fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "asnping=info",
        1 => "asnping=debug",
        _ => "asnping=trace",
    }
}

fn init_tracing(verbose: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let raw = normalize_args(std::env::args());

    // Quick check for version before starting async runtime
    if raw.len() == 2 && (raw[1] == "--version" || raw[1] == "-V") {
        println!("asnping {}", get_version());
        return;
    }

    let args = Args::parse_from(raw);
    init_tracing(args.verbose);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    if let Err(e) = runtime.block_on(async_main(args)) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn async_main(args: Args) -> Result<()> {
    let asns = parse_asn_list(&args.asn)?;
    let config = args.to_config()?;

    match available_icmp_mode() {
        Some(mode) => debug!(mode = mode.description(), "Probing with ICMP sockets"),
        None => warn!(
            root = is_root(),
            "Cannot open ICMP sockets (try sudo or CAP_NET_RAW); every probe will report unreachable"
        ),
    }

    let services = Services::new(&config)?;
    let discoverer = Discoverer::new(services, config);
    let report = discoverer.run(&asns).await;

    if args.json {
        display_json_results(&report)?;
    } else {
        print!("{}", format_text_results(&report));
    }
    Ok(())
}

fn display_json_results(report: &DiscoveryReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn format_text_results(report: &DiscoveryReport) -> String {
    let mut out = report.countries.to_string();

    let unresolved: Vec<String> = report
        .unresolved()
        .map(|r| match &r.outcome {
            AsnOutcome::Failed { reason } => format!("{} (failed: {})", r.asn, reason),
            _ => format!("{} (no pingable IP found)", r.asn),
        })
        .collect();

    if !unresolved.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("Unresolved:\n");
        for line in unresolved {
            out.push_str("  ");
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}
