// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The execution coordinator: run configuration and the init/run lifecycle.

use crate::backends::StrategyTable;
use crate::capability::{Backend, Capabilities};
use crate::error::{ConfigError, InitError, RunError};
use crate::info::SystemInfo;
use crate::macros::{log_debug, log_warn};
use crate::registry::{CallbackPair, CallbackRegistry, WorkCategory};
use std::num::NonZeroUsize;

/// Exclusive upper bound on the number of workers of a run.
pub const MAX_WORKERS: usize = 16;

/// Number of workers to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadCount {
    /// Run as many workers as returned by
    /// [`std::thread::available_parallelism()`], capped to `MAX_WORKERS - 1`.
    AvailableParallelism,
    /// Run the given number of workers.
    Count(NonZeroUsize),
}

impl ThreadCount {
    /// Resolves the number of workers to run.
    pub fn count(self) -> usize {
        match self {
            ThreadCount::AvailableParallelism => std::thread::available_parallelism()
                .map_or(1, usize::from)
                .min(MAX_WORKERS - 1),
            ThreadCount::Count(count) => count.get(),
        }
    }
}

impl TryFrom<usize> for ThreadCount {
    type Error = <NonZeroUsize as TryFrom<usize>>::Error;

    fn try_from(thread_count: usize) -> Result<Self, Self::Error> {
        let count = NonZeroUsize::try_from(thread_count)?;
        Ok(ThreadCount::Count(count))
    }
}

/// A builder for [`System`].
pub struct SystemBuilder {
    /// Number of workers to run.
    pub num_threads: ThreadCount,
    /// Kind of work to run.
    pub category: WorkCategory,
    /// Backend to run the workers with.
    pub backend: Backend,
}

impl SystemBuilder {
    /// Creates a configured system, restricted to the backends of
    /// [`Capabilities::global()`].
    ///
    /// ```
    /// # use dealpar::{Backend, CallbackPair, SystemBuilder, ThreadCount, WorkCategory};
    /// # use std::sync::atomic::{AtomicUsize, Ordering};
    /// # use std::sync::Arc;
    /// let mut system = SystemBuilder {
    ///     num_threads: ThreadCount::try_from(4).unwrap(),
    ///     category: WorkCategory::Solve,
    ///     backend: Backend::LibraryThreadPool,
    /// }
    /// .build()
    /// .unwrap();
    ///
    /// let solved = Arc::new(AtomicUsize::new(0));
    /// let counter = solved.clone();
    /// system.register_callbacks(
    ///     WorkCategory::Solve,
    ///     CallbackPair::new(
    ///         move |_thread_id| {
    ///             counter.fetch_add(1, Ordering::Relaxed);
    ///         },
    ///         |_thread_id| unreachable!(),
    ///     ),
    /// );
    ///
    /// system.initialize().unwrap();
    /// system.run(1).unwrap();
    /// assert_eq!(solved.load(Ordering::Relaxed), 4);
    /// ```
    pub fn build(&self) -> Result<System, ConfigError> {
        self.build_with(Capabilities::global())
    }

    /// Creates a configured system, restricted to the given backends.
    pub fn build_with(&self, capabilities: Capabilities) -> Result<System, ConfigError> {
        let mut system = System::with_capabilities(capabilities);
        system.configure(self.category, self.num_threads.count())?;
        system.prefer_backend(self.backend)?;
        Ok(system)
    }
}

/// Runs a worker function once per index in `0..num_threads`, using one of
/// several threading [`Backend`]s.
///
/// The lifecycle of a run is:
/// 1. [`configure()`](Self::configure) the category and worker count,
/// 2. optionally [`prefer_backend()`](Self::prefer_backend),
/// 3. [`initialize()`](Self::initialize) the backend's resources,
/// 4. [`run()`](Self::run), which consumes these resources.
///
/// A [`System`] runs at most one batch of workers at a time; this is enforced
/// by `run()` taking `&mut self`.
pub struct System {
    /// Kind of work to run.
    category: WorkCategory,
    /// Number of workers per run, in `1..MAX_WORKERS`.
    num_threads: usize,
    /// Backend used by `initialize()` and `run()`, always available.
    preferred: Backend,
    /// Backends that this system may use.
    capabilities: Capabilities,
    /// Strategy of each backend.
    strategies: StrategyTable,
    /// Worker functions of each category.
    callbacks: CallbackRegistry,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    /// Creates a system using the backends of [`Capabilities::global()`], with
    /// the default configuration: [`WorkCategory::Solve`], 1 worker,
    /// [`Backend::Direct`].
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::global())
    }

    /// Creates a system restricted to the given backends, with the default
    /// configuration. Backends that aren't compiled into this build remain
    /// unavailable.
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        let strategies = StrategyTable::new();
        let capabilities = capabilities.intersect(strategies.registered());
        Self {
            category: WorkCategory::Solve,
            num_threads: 1,
            preferred: Backend::Direct,
            capabilities,
            strategies,
            callbacks: CallbackRegistry::default(),
        }
    }

    /// Restores the default configuration and releases any backend resources
    /// allocated by [`initialize()`](Self::initialize). Registered worker
    /// functions are kept.
    pub fn reset(&mut self) {
        self.category = WorkCategory::Solve;
        self.num_threads = 1;
        self.preferred = Backend::Direct;
        self.strategies.release_all();
    }

    /// Sets the category and number of workers of the next runs.
    ///
    /// Fails with [`ConfigError::InvalidWorkerCount`] unless
    /// `1 <= num_threads < MAX_WORKERS`, in which case nothing is changed.
    pub fn configure(
        &mut self,
        category: WorkCategory,
        num_threads: usize,
    ) -> Result<(), ConfigError> {
        if !(1..MAX_WORKERS).contains(&num_threads) {
            log_warn!("Rejected worker count {num_threads}");
            return Err(ConfigError::InvalidWorkerCount {
                count: num_threads,
                max: MAX_WORKERS,
            });
        }
        self.category = category;
        self.num_threads = num_threads;
        log_debug!("Configured {category} with {num_threads} workers");
        Ok(())
    }

    /// Like [`configure()`](Self::configure), with the category given as a
    /// numeric code. Fails with [`ConfigError::InvalidCategory`] for unknown
    /// codes.
    pub fn configure_raw(&mut self, category: u32, num_threads: usize) -> Result<(), ConfigError> {
        let category = WorkCategory::try_from(category)?;
        self.configure(category, num_threads)
    }

    /// Selects the backend of the next runs.
    ///
    /// Fails with [`ConfigError::BackendUnavailable`] if the backend can't be
    /// used by this system, in which case the preference is unchanged.
    /// Resources already allocated for another backend are left alone.
    pub fn prefer_backend(&mut self, backend: Backend) -> Result<(), ConfigError> {
        if !self.capabilities.is_available(backend) {
            log_warn!("Backend {backend} is not available");
            return Err(ConfigError::BackendUnavailable(backend));
        }
        self.preferred = backend;
        log_debug!("Preferring backend {backend}");
        Ok(())
    }

    /// Like [`prefer_backend()`](Self::prefer_backend), with the backend given
    /// as a numeric code. Fails with [`ConfigError::UnknownBackend`] for
    /// unknown codes.
    pub fn prefer_backend_raw(&mut self, backend: u32) -> Result<(), ConfigError> {
        let backend = Backend::try_from(backend)?;
        self.prefer_backend(backend)
    }

    /// Registers the worker functions of a category, replacing any previous
    /// ones.
    pub fn register_callbacks(&mut self, category: WorkCategory, callbacks: CallbackPair) {
        self.callbacks.register(category, callbacks);
    }

    /// Allocates the resources of the preferred backend for the configured
    /// number of workers. Must be called before each [`run()`](Self::run).
    pub fn initialize(&mut self) -> Result<(), InitError> {
        log_debug!(
            "[{}] Initializing for {} workers",
            self.preferred,
            self.num_threads
        );
        self.strategies
            .get_mut(self.preferred)
            .init(self.num_threads)
    }

    /// Runs the worker function of the configured category once per index in
    /// `0..num_threads` with the preferred backend, and blocks until all the
    /// invocations have completed.
    ///
    /// The simple worker function is selected if `chunk_size` is 1, the
    /// chunked one otherwise. Errors are returned as-is, without retrying.
    pub fn run(&mut self, chunk_size: usize) -> Result<(), RunError> {
        let strategy = self.strategies.get_mut(self.preferred);
        let callback = match self.callbacks.get(self.category) {
            Some(pair) => pair.select(chunk_size).clone(),
            None => {
                // The run is over, so the resources of `initialize()` go too.
                strategy.release();
                return Err(RunError::MissingCallback(self.category));
            }
        };

        log_debug!(
            "[{}] Running {} workers for {} (chunk size {chunk_size})",
            self.preferred,
            self.num_threads,
            self.category
        );
        let result = strategy.run_all(self.num_threads, &callback);
        log_debug!("[{}] Run finished: {result:?}", self.preferred);
        result
    }

    /// Returns a report of this build and of the current configuration.
    pub fn describe(&self) -> SystemInfo {
        SystemInfo::new(&self.capabilities, self.preferred, self.num_threads)
    }

    /// Returns the configured work category.
    pub fn category(&self) -> WorkCategory {
        self.category
    }

    /// Returns the configured number of workers.
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Returns the preferred backend.
    pub fn preferred_backend(&self) -> Backend {
        self.preferred
    }

    /// Returns the backends that this system may use.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }
}
