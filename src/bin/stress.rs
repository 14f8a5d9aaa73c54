use stripe_table::{HashTable, InsertMode};

use std::{
    collections::HashSet,
    sync::Barrier,
    thread::{self, ScopedJoinHandle},
    time::{Duration, Instant},
};

use log::LevelFilter;
use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};
use structopt::StructOpt;

/// Inserts distinct random keys from many threads at once, then reports how
/// many of them can be found again.
#[derive(StructOpt)]
struct Options {
    /// Number of inserting threads
    #[structopt(short = "t", long, default_value = "4")]
    threads: usize,
    /// Keys inserted by each thread
    #[structopt(short = "s", long, default_value = "25000")]
    size: usize,
    /// How new keys are linked: "two-phase" or "recheck"
    #[structopt(short = "m", long, default_value = "two-phase")]
    mode: InsertMode,
    /// Seed for key generation
    #[structopt(long, default_value = "0")]
    seed: u64,
    /// Log every insert decision
    #[structopt(short = "v", long)]
    verbose: bool,
}

const KEY_LENGTH: usize = 16;

fn main() {
    let options = Options::from_args();

    env_logger::Builder::new()
        .filter_level(if options.verbose {
            LevelFilter::Trace
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    if options.threads == 0 {
        eprintln!("--threads must be at least 1");
        std::process::exit(1)
    }

    let keys = generate_keys(options.seed, options.threads * options.size);

    let table = HashTable::with_insert_mode(options.mode);
    let barrier = Barrier::new(options.threads);

    let elapsed = thread::scope(|s| {
        let threads: Vec<_> = keys
            .chunks(options.size.max(1))
            .map(|chunk| {
                let (table, barrier) = (&table, &barrier);

                s.spawn(move || {
                    barrier.wait();
                    let start = Instant::now();

                    for (i, key) in chunk.iter().enumerate() {
                        table.add_entry(key, i as u32);
                    }

                    start.elapsed()
                })
            })
            .collect();

        slowest(threads)
    });

    let missing = keys.iter().filter(|key| table.get(key).is_none()).count();
    let duplicated = keys.iter().filter(|key| table.entry_count(key) > 1).count();

    println!(
        "{} mode, {} threads x {} keys: {} usec",
        options.mode,
        options.threads,
        options.size,
        elapsed.as_micros()
    );
    println!("  - {} missing", missing);
    println!("  - {} duplicated ({} entries linked)", duplicated, table.len());

    if missing > 0 || duplicated > 0 {
        log::warn!(
            "{} of {} keys missing, {} duplicated",
            missing,
            keys.len(),
            duplicated
        );
    }
}

/// Joins every worker and returns the longest elapsed time. Panics if any
/// worker panicked.
fn slowest(threads: Vec<ScopedJoinHandle<'_, Duration>>) -> Duration {
    threads
        .into_iter()
        .map(|t| t.join().expect("worker panicked"))
        .max()
        .unwrap_or(Duration::ZERO)
}

fn generate_keys(seed: u64, count: usize) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut seen = HashSet::with_capacity(count);
    let mut keys = Vec::with_capacity(count);

    while keys.len() < count {
        let key: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(KEY_LENGTH)
            .map(char::from)
            .collect();

        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }

    keys
}
