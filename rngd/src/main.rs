//! Demo consumer for `jitterentropy-rand`. Mixes collector output into a
//! running state with SHA3-512, the way a userspace entropy daemon would
//! feed a kernel CRNG — except there is no kernel here to feed, so the
//! daemon subcommand just prints the mixed output.

use clap::{Parser, Subcommand};
use jitterentropy_core::PlatformHooks;
use jitterentropy_rand::RandJitterEntropy;
use log::{debug, error, info};
use rand::{RngCore, TryRngCore};
use sha3::{Digest, Sha3_512};
use std::io::Write;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ToolArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the one-time platform self-test and exit.
    SelfTest,
    /// Continuously mix fresh entropy into a running state and print it.
    Daemon {
        #[arg(short, long, default_value_t = false)]
        oneshot: bool,
        #[arg(short, long, default_value_t = 10)]
        seed_interval_s: u64,
    },
    /// Write raw entropy bytes to stdout.
    Stream {
        #[arg(short, long, default_value_t = 1024)]
        bytes: usize,
    },
    /// Report achievable throughput over a short run.
    Bench {
        #[arg(short, long, default_value_t = 2)]
        seconds: u64,
    },
    /// Report whether the continuous FIPS-mode health test is engaged.
    Health,
}

const RNG_STATE_SIZE_BYTE: usize = 64;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct RandomState([u8; RNG_STATE_SIZE_BYTE]);

impl Default for RandomState {
    fn default() -> Self {
        Self([0; RNG_STATE_SIZE_BYTE])
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = ToolArgs::parse();

    match args.command {
        Command::SelfTest => run_self_test(),
        Command::Daemon {
            oneshot,
            seed_interval_s,
        } => run_daemon(oneshot, seed_interval_s),
        Command::Stream { bytes } => run_stream(bytes),
        Command::Bench { seconds } => run_bench(seconds),
        Command::Health => run_health(),
    }
}

fn run_self_test() -> ExitCode {
    match jitterentropy_core::init() {
        Ok(()) => {
            info!("self-test passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("self-test failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Build a collector and turn it into an infallible `RngCore`, the way the
/// library this crate wraps treats a health-test failure: as unrecoverable,
/// not worth threading `Result` through every downstream call site.
fn new_rng() -> Option<impl RngCore> {
    match RandJitterEntropy::new() {
        Ok(rng) => Some(rng.unwrap_err()),
        Err(e) => {
            error!("failed to create jitterentropy instance: {e}");
            None
        }
    }
}

fn run_daemon(oneshot: bool, seed_interval_s: u64) -> ExitCode {
    info!("starting jitter-rngd");

    let Some(mut rng) = new_rng() else {
        return ExitCode::FAILURE;
    };

    let mut state = RandomState::default();
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    loop {
        let mut output = RandomState::default();

        let mut hasher_state = Sha3_512::new();
        let mut hasher_output = Sha3_512::new();

        // domain separation
        hasher_state.update("STATE");
        hasher_output.update("RAND0");

        // fold the previous state back in
        hasher_state.update(state.0);
        hasher_output.update(state.0);

        rng.fill_bytes(&mut output.0);
        hasher_state.update(output.0);
        hasher_output.update(output.0);

        state
            .0
            .copy_from_slice(&hasher_state.finalize()[..RNG_STATE_SIZE_BYTE]);
        output
            .0
            .copy_from_slice(&hasher_output.finalize()[..RNG_STATE_SIZE_BYTE]);

        debug!("gathered entropy and hashed into state");

        if let Err(e) = handle.write_all(&output.0) {
            error!("failed to write output: {e}");
            return ExitCode::FAILURE;
        }

        if oneshot {
            break;
        }

        std::thread::sleep(Duration::from_secs(seed_interval_s));
    }

    ExitCode::SUCCESS
}

fn run_stream(bytes: usize) -> ExitCode {
    let Some(mut rng) = new_rng() else {
        return ExitCode::FAILURE;
    };

    let mut remaining = bytes;
    let mut buf = [0u8; 4096];
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    while remaining > 0 {
        let chunk = remaining.min(buf.len());
        rng.fill_bytes(&mut buf[..chunk]);
        if let Err(e) = handle.write_all(&buf[..chunk]) {
            error!("failed to write output: {e}");
            return ExitCode::FAILURE;
        }
        remaining -= chunk;
    }

    ExitCode::SUCCESS
}

fn run_bench(seconds: u64) -> ExitCode {
    let Some(mut rng) = new_rng() else {
        return ExitCode::FAILURE;
    };

    let start = Instant::now();
    let mut num_bytes: u64 = 0;
    let mut buf = [0u8; 32];

    loop {
        rng.fill_bytes(&mut buf);
        num_bytes += buf.len() as u64;

        let elapsed = start.elapsed();
        if elapsed.as_secs() >= seconds {
            let datarate = num_bytes as f64 / elapsed.as_secs_f64() / 1024.0;
            println!("datarate: {datarate:.2} KiB/s");
            break;
        }
    }

    ExitCode::SUCCESS
}

fn run_health() -> ExitCode {
    if jitterentropy_core::SystemHooks.fips_enabled() {
        println!("FIPS mode detected: continuous health test is engaged");
    } else {
        println!("FIPS mode not detected: continuous health test is inactive");
    }
    ExitCode::SUCCESS
}
