// src/main.rs

use batchgcd::algorithms;
use batchgcd::config::BatchConfig;
use batchgcd::core::collision::Collision;
use batchgcd::core::dedup::uniqify_collisions;
use batchgcd::input::moduli_reader;
use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::{error, info};
use num::BigInt;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread;

#[derive(Parser, Debug)]
#[command(
    name = "batchgcd",
    about = "Audit a batch of RSA public moduli for shared prime factors"
)]
struct Args {
    /// Input files, one base64 modulus record per line (CSV accepted)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Batch GCD algorithm to run
    #[arg(long, value_enum, default_value_t = Algorithm::SmoothParts)]
    algorithm: Algorithm,

    /// Write a CPU profile (flamegraph) to this path
    #[arg(long)]
    cpuprofile: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    #[value(name = "pairwise")]
    Pairwise,
    #[value(name = "mulaccum")]
    MulAccum,
    #[value(name = "smoothparts")]
    SmoothParts,
    #[value(name = "smoothparts_lowmem")]
    SmoothPartsLowMem,
}

fn main() {
    // Load configuration first (before logging is initialized)
    let config = BatchConfig::load().unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
        BatchConfig::default()
    });
    let args = Args::parse();

    // Initialize logging based on config (can be overridden by env var)
    let log_level =
        std::env::var("BATCHGCD_LOG_LEVEL").unwrap_or_else(|_| config.log_level.clone());
    let env = Env::default().filter_or("BATCHGCD_LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env).init();

    let threads = config.threads.unwrap_or_else(num_cpus::get);
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        error!("Failed to configure thread pool: {}", e);
        process::exit(1);
    }
    info!(
        "Using {} worker threads (total cores: {})",
        threads,
        num_cpus::get()
    );

    let profiler = args.cpuprofile.as_ref().map(|path| {
        info!("Profiling CPU usage into {}", path.display());
        match pprof::ProfilerGuardBuilder::default().frequency(99).build() {
            Ok(guard) => guard,
            Err(e) => {
                error!("Cannot start CPU profiler: {}", e);
                process::exit(1);
            }
        }
    });

    match args.algorithm {
        Algorithm::Pairwise => run_in_memory(algorithms::basic_pairwise_gcd, &args, &config),
        Algorithm::MulAccum => run_in_memory(algorithms::mul_accum_gcd, &args, &config),
        Algorithm::SmoothParts => run_in_memory(algorithms::smooth_parts_gcd, &args, &config),
        Algorithm::SmoothPartsLowMem => run_low_mem(&args, &config),
    }

    if let (Some(path), Some(guard)) = (args.cpuprofile.as_ref(), profiler.as_ref()) {
        write_profile(guard, path);
    }

    info!("Finished.");
}

/// Load every file up front, run the engine over the slice on its own
/// thread, and print each verified collision in block form.
fn run_in_memory(engine: fn(&[BigInt], SyncSender<Collision>), args: &Args, config: &BatchConfig) {
    let moduli = load_moduli(&args.files);
    info!("Loaded {} moduli", moduli.len());

    let (tx, rx) = sync_channel(config.channel_capacity);
    info!("Executing...");
    let worker = thread::spawn(move || engine(&moduli, tx));

    for compromised in uniqify_collisions(rx, config.channel_capacity).iter() {
        if !compromised.verify() {
            error!("Verification failed on {}", compromised);
            process::exit(1);
        }
        println!("{}", compromised);
    }

    if worker.join().is_err() {
        error!("Engine thread panicked");
        process::exit(1);
    }
}

/// Stream the files straight into the low-memory pipeline and print each
/// verified collision in CSV form.
fn run_low_mem(args: &Args, config: &BatchConfig) {
    let (moduli_tx, moduli_rx) = sync_channel(1);
    let (collision_tx, collision_rx) = sync_channel(config.channel_capacity);
    info!("Executing...");
    algorithms::low_mem_smooth_parts_gcd(moduli_rx, collision_tx);

    let mut seen = HashSet::new();
    for path in &args.files {
        info!("Reading moduli from {}", path.display());
        let result = moduli_reader::read_moduli(path, &mut seen, |m| {
            let _ = moduli_tx.send(m);
        });
        match result {
            Ok(lines) => info!("Done reading {} lines from {}", lines, path.display()),
            Err(e) => {
                error!("Cannot read {}: {}", path.display(), e);
                process::exit(1);
            }
        }
    }
    drop(moduli_tx);

    for compromised in uniqify_collisions(collision_rx, config.channel_capacity).iter() {
        if !compromised.verify() {
            error!("Verification failed on {}", compromised);
            process::exit(1);
        }
        println!("{}", compromised.csv());
    }
}

fn load_moduli(files: &[PathBuf]) -> Vec<BigInt> {
    let mut seen = HashSet::new();
    let mut moduli = Vec::new();
    for path in files {
        info!("Loading moduli from {}", path.display());
        match moduli_reader::read_moduli(path, &mut seen, |m| moduli.push(m)) {
            Ok(lines) => info!("Done reading {} lines from {}", lines, path.display()),
            Err(e) => {
                error!("Cannot read {}: {}", path.display(), e);
                process::exit(1);
            }
        }
    }
    moduli
}

fn write_profile(guard: &pprof::ProfilerGuard, path: &Path) {
    let report = match guard.report().build() {
        Ok(report) => report,
        Err(e) => {
            error!("CPU profile report failed: {}", e);
            process::exit(1);
        }
    };
    let file = match File::create(path) {
        Ok(file) => file,
        Err(e) => {
            error!("Cannot create {}: {}", path.display(), e);
            process::exit(1);
        }
    };
    if let Err(e) = report.flamegraph(file) {
        error!("Writing CPU profile to {} failed: {}", path.display(), e);
        process::exit(1);
    }
    info!("CPU profile written to {}", path.display());
}
