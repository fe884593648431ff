// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parallel region over a dedicated team of threads with a fixed size. Every
//! team member loops over a dynamically scheduled index range until it is
//! exhausted, and the region ends with an implicit barrier.

use super::{invoke, Strategy};
use crate::capability::Backend;
use crate::error::{InitError, RunError};
use crate::macros::{log_debug, log_error, log_trace};
use crate::registry::Callback;
use crossbeam_utils::CachePadded;
use rayon_core::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Dropping a rayon [`ThreadPool`] only asks its threads to terminate, without
/// joining them. A finished team is therefore parked and handed back by the
/// next `init()` of the same size, rather than rebuilt for every run.
#[derive(Default)]
pub struct ParallelRegion {
    /// Team of exactly `num_threads` threads, armed by `init()` and consumed
    /// by the next run.
    team: Option<ThreadPool>,
    /// Team left over from the last run, not usable until re-armed by `init()`.
    idle: Option<ThreadPool>,
}

impl Strategy for ParallelRegion {
    fn init(&mut self, num_threads: usize) -> Result<(), InitError> {
        if let Some(team) = self.team.take().or_else(|| self.idle.take()) {
            if team.current_num_threads() == num_threads {
                log_debug!(
                    "[{}] Reusing the team of {num_threads} threads",
                    Backend::CompilerParallel
                );
                self.team = Some(team);
                return Ok(());
            }
        }

        // An explicit thread count disables rayon's own sizing of the team.
        let team = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|id| format!("dealpar-team-{id}"))
            .build()
            .map_err(|e| InitError::ThreadPoolBuildFailed {
                backend: Backend::CompilerParallel,
                reason: e.to_string(),
            })?;
        log_debug!(
            "[{}] Built a team of {} threads",
            Backend::CompilerParallel,
            team.current_num_threads()
        );
        self.team = Some(team);
        Ok(())
    }

    fn run_all(&mut self, num_threads: usize, callback: &Callback) -> Result<(), RunError> {
        let team = match self.team.take() {
            Some(team) if team.current_num_threads() == num_threads => team,
            team => {
                if team.is_some() {
                    self.idle = team;
                }
                return Err(RunError::NotInitialized(Backend::CompilerParallel));
            }
        };

        let next_index = CachePadded::new(AtomicUsize::new(0));
        let panicked = CachePadded::new(AtomicUsize::new(0));
        team.broadcast(|_ctx| loop {
            let index = next_index.fetch_add(1, Ordering::Relaxed);
            if index >= num_threads {
                break;
            }
            log_trace!(
                "[{}] Team member {} claimed index {index}",
                Backend::CompilerParallel,
                _ctx.index()
            );
            if invoke(callback, index) {
                panicked.fetch_add(1, Ordering::Relaxed);
            }
        });
        // `broadcast()` returns once every team member has left the loop.
        self.idle = Some(team);

        let panicked = panicked.load(Ordering::Relaxed);
        if panicked != 0 {
            log_error!("[{}] {panicked} worker(s) panicked", Backend::CompilerParallel);
            return Err(RunError::WaitFailed {
                backend: Backend::CompilerParallel,
                panicked,
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        self.team = None;
        self.idle = None;
    }
}
