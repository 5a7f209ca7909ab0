//! FlashCache soak driver
//!
//! Builds an expiring cache from command-line flags, hammers it from a set of
//! writer threads, and logs store and queue sizes once per second so expiry
//! can be watched in real time.

use anyhow::{bail, Context};
use flashcache::{CacheConfig, ExpiringCache};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Soak configuration
struct Config {
    /// Cache settings
    cache: CacheConfig,
    /// Number of writer threads
    threads: usize,
    /// How long to run
    duration: Duration,
    /// Size of the key space writers draw from
    keys: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheConfig::new(5, 0, 1, 16),
            threads: 4,
            duration: Duration::from_secs(15),
            keys: 100_000,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> anyhow::Result<Self> {
        let mut config = Config::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--ttl" | "-t" => {
                    config.cache.ttl = Duration::from_secs(parse_value(&arg, args.next())?);
                }
                "--sweep" | "-s" => {
                    config.cache.sweep_interval =
                        Duration::from_secs(parse_value(&arg, args.next())?);
                }
                "--shards" => {
                    config.cache.shard_count = parse_value(&arg, args.next())?;
                }
                "--capacity" => {
                    config.cache.capacity_hint = parse_value(&arg, args.next())?;
                }
                "--threads" | "-n" => {
                    config.threads = parse_value(&arg, args.next())?;
                }
                "--duration" | "-d" => {
                    config.duration = Duration::from_secs(parse_value(&arg, args.next())?);
                }
                "--keys" | "-k" => {
                    config.keys = parse_value(&arg, args.next())?;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("FlashCache version {}", flashcache::VERSION);
                    std::process::exit(0);
                }
                other => {
                    print_help();
                    bail!("unknown argument: {}", other);
                }
            }
        }

        if config.keys == 0 {
            bail!("--keys must be at least 1");
        }
        config.cache.validate()?;
        Ok(config)
    }
}

fn parse_value<T>(flag: &str, value: Option<String>) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.with_context(|| format!("{} requires a value", flag))?;
    value
        .parse()
        .with_context(|| format!("invalid value for {}: {}", flag, value))
}

fn print_help() {
    println!(
        r#"
FlashCache - Expiring cache soak driver

USAGE:
    flashcache [OPTIONS]

OPTIONS:
    -t, --ttl <SECS>         Key time-to-live (default: 5)
    -s, --sweep <SECS>       Reaper sweep interval (default: 1)
        --shards <N>         Store shard count (default: 16)
        --capacity <N>       Advisory capacity hint (default: 0)
    -n, --threads <N>        Writer threads (default: 4)
    -d, --duration <SECS>    How long to run (default: 15)
    -k, --keys <N>           Key space size (default: 100000)
    -v, --version            Print version information
        --help               Print this help message

LOGGING:
    Set RUST_LOG to adjust verbosity, e.g. RUST_LOG=flashcache=debug
"#
    );
}

/// Counters shared by the writer threads
#[derive(Debug, Default)]
struct SoakStats {
    /// Puts that inserted a new key
    inserted: AtomicU64,
    /// Puts rejected because the key was live
    duplicates: AtomicU64,
    /// Gets that found a value
    hits: AtomicU64,
    /// Gets that found nothing
    misses: AtomicU64,
}

impl SoakStats {
    fn record_put(&self, inserted: bool) {
        let counter = if inserted {
            &self.inserted
        } else {
            &self.duplicates
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_get(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_names(true)
        .init();

    let config = Config::from_args()?;

    let cache = Arc::new(ExpiringCache::<u64, u64>::new(config.cache.clone())?);
    let stats = Arc::new(SoakStats::default());
    let running = Arc::new(AtomicBool::new(true));

    info!(
        threads = config.threads,
        duration_s = config.duration.as_secs(),
        keys = config.keys,
        "Starting soak run"
    );

    let writers: Vec<_> = (0..config.threads as u64)
        .map(|id| {
            let cache = Arc::clone(&cache);
            let stats = Arc::clone(&stats);
            let running = Arc::clone(&running);
            let keys = config.keys;
            tokio::task::spawn_blocking(move || write_loop(id, keys, &cache, &stats, &running))
        })
        .collect();

    // Run until the duration elapses or Ctrl+C arrives
    tokio::select! {
        _ = report_loop(&cache, &stats) => {}
        _ = tokio::time::sleep(config.duration) => {
            info!("Soak duration elapsed");
        }
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Shutdown signal received, stopping writers...");
        }
    }

    running.store(false, Ordering::Relaxed);
    for writer in writers {
        writer.await.context("writer task failed")?;
    }

    report(&cache, &stats);

    match Arc::try_unwrap(cache) {
        Ok(mut cache) => cache.shutdown()?,
        Err(_) => bail!("cache still shared after writers finished"),
    }

    info!("Soak run complete");
    Ok(())
}

/// One writer: insert keys and read back others until told to stop
fn write_loop(
    id: u64,
    keys: u64,
    cache: &ExpiringCache<u64, u64>,
    stats: &SoakStats,
    running: &AtomicBool,
) {
    let mut i: u64 = 0;
    while running.load(Ordering::Relaxed) {
        let key = id.wrapping_mul(7_919).wrapping_add(i.wrapping_mul(104_729)) % keys;
        stats.record_put(cache.put(key, i));

        let probe = i.wrapping_mul(15_485_863) % keys;
        stats.record_get(cache.get(&probe).is_some());

        i = i.wrapping_add(1);
        if i % 1024 == 0 {
            std::thread::yield_now();
        }
    }
}

/// Logs cache sizes once per second
async fn report_loop(cache: &ExpiringCache<u64, u64>, stats: &SoakStats) {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    loop {
        ticker.tick().await;
        report(cache, stats);
    }
}

fn report(cache: &ExpiringCache<u64, u64>, stats: &SoakStats) {
    info!(
        live = cache.size(),
        queued = cache.debug_queue_size(),
        inserted = stats.inserted.load(Ordering::Relaxed),
        duplicates = stats.duplicates.load(Ordering::Relaxed),
        hits = stats.hits.load(Ordering::Relaxed),
        misses = stats.misses.load(Ordering::Relaxed),
        reaper = ?cache.reaper_state(),
        "Cache status"
    );
}
