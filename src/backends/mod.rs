// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution strategies, one per [`Backend`].

mod direct;
#[cfg(feature = "rayon")]
mod dispatch;
mod native;
#[cfg(feature = "rayon")]
mod parallel_region;
mod thread_pool;

use crate::capability::{Backend, Capabilities};
use crate::error::{InitError, RunError};
use crate::registry::Callback;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// How one backend allocates its resources and runs the indexed workers.
///
/// Resources allocated by [`init()`](Self::init) are consumed by the next
/// [`run_all()`](Self::run_all), which releases them before returning, on
/// success and on failure alike.
pub(crate) trait Strategy: Send {
    /// Allocates the resources needed to run `num_threads` workers.
    fn init(&mut self, num_threads: usize) -> Result<(), InitError>;

    /// Invokes `callback` once for each index in `0..num_threads`, and returns
    /// once all the invocations have completed.
    fn run_all(&mut self, num_threads: usize, callback: &Callback) -> Result<(), RunError>;

    /// Releases any resources allocated by [`init()`](Self::init) that no run
    /// has consumed yet.
    fn release(&mut self) {}
}

/// The strategies compiled into this build, keyed by [`Backend`].
pub(crate) struct StrategyTable {
    strategies: [Option<Box<dyn Strategy>>; Backend::COUNT],
}

impl StrategyTable {
    /// Registers every strategy available in this build.
    pub fn new() -> Self {
        let mut table = Self {
            strategies: Default::default(),
        };
        table.register(Backend::Direct, Box::new(direct::Direct));
        table.register(
            Backend::NativeThreads,
            Box::new(native::NativeThreads::default()),
        );
        #[cfg(feature = "rayon")]
        table.register(
            Backend::CompilerParallel,
            Box::new(parallel_region::ParallelRegion::default()),
        );
        #[cfg(feature = "rayon")]
        table.register(Backend::DispatchQueue, Box::new(dispatch::DispatchQueue));
        table.register(
            Backend::LibraryThreadPool,
            Box::new(thread_pool::LibraryThreadPool::default()),
        );
        table
    }

    fn register(&mut self, backend: Backend, strategy: Box<dyn Strategy>) {
        self.strategies[backend.index()] = Some(strategy);
    }

    /// Returns the backends that have a registered strategy.
    pub fn registered(&self) -> Capabilities {
        Capabilities::only(
            Backend::ALL
                .into_iter()
                .filter(|backend| self.strategies[backend.index()].is_some()),
        )
    }

    /// Returns the strategy of the given backend, which must be registered.
    pub fn get_mut(&mut self, backend: Backend) -> &mut (dyn Strategy + 'static) {
        self.strategies[backend.index()]
            .as_deref_mut()
            .expect("no strategy registered for the preferred backend")
    }

    /// Releases the pending resources of all the strategies.
    pub fn release_all(&mut self) {
        for strategy in self.strategies.iter_mut().flatten() {
            strategy.release();
        }
    }
}

/// Invokes the callback on the given index, and returns whether it panicked.
///
/// Panics are contained to the worker that raised them so that the remaining
/// indices still run, and are reported to the caller as a failed wait.
fn invoke(callback: &Callback, index: usize) -> bool {
    catch_unwind(AssertUnwindSafe(|| callback(index))).is_err()
}
