// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! CLI tool to "solve" a batch of random deals with a chosen backend.
//!
//! The solver here only counts high-card points per hand: it stands in for a
//! real double-dummy solver so that the threading layer can be exercised.

use clap::Parser;
use dealpar::{Backend, CallbackPair, System, ThreadCount, WorkCategory};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A deal: the owner (0 to 3) of each of the 52 cards. Card `c` has rank
/// `c % 13`, where ranks 9 to 12 are the jack, queen, king and ace.
type Deal = [u8; 52];

/// Boards shared by all the workers of a run.
struct Batch {
    deals: Vec<Deal>,
    /// Next board to solve.
    next: AtomicUsize,
    /// High-card points of the first hand of each board.
    points: Vec<AtomicU32>,
    /// Number of boards solved by each worker.
    per_worker: Vec<AtomicUsize>,
}

impl Batch {
    fn new(num_deals: usize, seed: u64) -> Self {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let deals = (0..num_deals)
            .map(|_| {
                let mut owners: Deal = std::array::from_fn(|card| (card / 13) as u8);
                owners.shuffle(&mut rng);
                owners
            })
            .collect();
        Self {
            deals,
            next: AtomicUsize::new(0),
            points: (0..num_deals).map(|_| AtomicU32::new(0)).collect(),
            per_worker: (0..dealpar::MAX_WORKERS)
                .map(|_| AtomicUsize::new(0))
                .collect(),
        }
    }

    fn solve_board(&self, board: usize) {
        let points = self.deals[board]
            .iter()
            .enumerate()
            .filter(|(_, owner)| **owner == 0)
            .map(|(card, _)| (card % 13).saturating_sub(8) as u32)
            .sum();
        self.points[board].store(points, Ordering::Relaxed);
    }

    /// Claims boards one at a time until none are left.
    fn solve_simple(&self, thread_id: usize) {
        loop {
            let board = self.next.fetch_add(1, Ordering::Relaxed);
            if board >= self.deals.len() {
                break;
            }
            self.solve_board(board);
            self.per_worker[thread_id].fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Claims chunks of consecutive boards until none are left.
    fn solve_chunked(&self, thread_id: usize, chunk_size: usize) {
        loop {
            let start = self.next.fetch_add(chunk_size, Ordering::Relaxed);
            if start >= self.deals.len() {
                break;
            }
            let end = (start + chunk_size).min(self.deals.len());
            for board in start..end {
                self.solve_board(board);
            }
            self.per_worker[thread_id].fetch_add(end - start, Ordering::Relaxed);
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let batch = Arc::new(Batch::new(cli.deals, cli.seed));
    let chunk_size = cli.chunk_size.get();

    let mut system = System::new();
    system.register_callbacks(
        WorkCategory::Solve,
        CallbackPair::new(
            {
                let batch = batch.clone();
                move |thread_id| batch.solve_simple(thread_id)
            },
            {
                let batch = batch.clone();
                move |thread_id| batch.solve_chunked(thread_id, chunk_size)
            },
        ),
    );

    let num_threads = match cli.num_threads {
        Some(num_threads) => ThreadCount::Count(num_threads),
        None => ThreadCount::AvailableParallelism,
    };
    if let Err(e) = system.configure(WorkCategory::Solve, num_threads.count()) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    if let Err(e) = system.prefer_backend(cli.backend) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    print!("{}", system.describe());

    let start = Instant::now();
    let result = system
        .initialize()
        .map_err(|e| e.to_string())
        .and_then(|()| system.run(chunk_size).map_err(|e| e.to_string()));
    if let Err(e) = result {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }
    let elapsed = start.elapsed();

    let total_points: u64 = batch
        .points
        .iter()
        .map(|points| u64::from(points.load(Ordering::Relaxed)))
        .sum();
    println!(
        "solved {} deals in {elapsed:?}, average of {:.2} HCP in the first hand",
        cli.deals,
        total_points as f64 / cli.deals.max(1) as f64
    );
    for (thread_id, solved) in batch.per_worker[..system.num_threads()].iter().enumerate() {
        println!("  worker {thread_id:>2}: {:>6} deals", solved.load(Ordering::Relaxed));
    }
    ExitCode::SUCCESS
}

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Cli {
    /// Backend to run the workers with (none, threads, parallel, dispatch,
    /// pool).
    #[arg(long, value_parser = parse_backend, default_value = "threads")]
    backend: Backend,

    /// Number of workers (defaults to the available parallelism).
    #[arg(long)]
    num_threads: Option<NonZeroUsize>,

    /// Number of deals to solve.
    #[arg(long, default_value_t = 1000)]
    deals: usize,

    /// Number of deals claimed at once by a worker.
    #[arg(long, default_value = "1")]
    chunk_size: NonZeroUsize,

    /// Seed of the deal generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn parse_backend(name: &str) -> Result<Backend, String> {
    name.parse().map_err(|e: dealpar::ConfigError| e.to_string())
}
