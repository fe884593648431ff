// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Errors returned by the configuration, initialization and run phases.
//!
//! Each error maps to a stable negative status code via `code()`, so that
//! callers bridging to a C-style interface can report them as such.

use crate::capability::Backend;
use crate::registry::WorkCategory;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;

/// Status code for faults without a more specific code.
pub const RETURN_UNKNOWN_FAULT: i32 = -1;
/// Status code for a worker count outside of the supported range.
pub const RETURN_THREAD_INDEX: i32 = -12;
/// Status code for a failure to create a thread or synchronization resource.
pub const RETURN_THREAD_CREATE: i32 = -15;
/// Status code for a failure while waiting for the workers to complete.
pub const RETURN_THREAD_WAIT: i32 = -16;
/// Status code for an unknown or unavailable backend or category.
pub const RETURN_THREAD_MISSING: i32 = -17;

/// Invalid configuration of a [`System`](crate::System). The configuration is
/// left unchanged when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The raw work category code isn't a known [`WorkCategory`].
    InvalidCategory(u32),
    /// The worker count isn't in `1..max`.
    InvalidWorkerCount {
        /// Requested worker count.
        count: usize,
        /// Exclusive upper bound on the worker count.
        max: usize,
    },
    /// The raw backend code isn't a known [`Backend`].
    UnknownBackend(u32),
    /// The backend isn't available in this process.
    BackendUnavailable(Backend),
    /// The name doesn't match any backend or work category.
    UnrecognizedName(String),
}

impl ConfigError {
    /// Returns the status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            ConfigError::InvalidWorkerCount { .. } => RETURN_THREAD_INDEX,
            ConfigError::InvalidCategory(_)
            | ConfigError::UnknownBackend(_)
            | ConfigError::BackendUnavailable(_) => RETURN_THREAD_MISSING,
            ConfigError::UnrecognizedName(_) => RETURN_UNKNOWN_FAULT,
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCategory(code) => write!(f, "invalid work category code {code}"),
            ConfigError::InvalidWorkerCount { count, max } => {
                write!(f, "invalid worker count {count}, expected 1 to {}", max - 1)
            }
            ConfigError::UnknownBackend(code) => write!(f, "unknown backend code {code}"),
            ConfigError::BackendUnavailable(backend) => {
                write!(f, "backend {backend} is not available on this build")
            }
            ConfigError::UnrecognizedName(name) => write!(f, "unrecognized name {name:?}"),
        }
    }
}

impl Error for ConfigError {}

/// Failure to allocate the resources of a backend.
#[derive(Debug)]
pub enum InitError {
    /// The per-worker synchronization resources couldn't be allocated.
    SyncResourceCreationFailed {
        /// Backend being initialized.
        backend: Backend,
        /// Number of worker slots requested.
        slots: usize,
    },
    /// The dedicated thread team couldn't be built.
    ThreadPoolBuildFailed {
        /// Backend being initialized.
        backend: Backend,
        /// Description of the underlying failure.
        reason: String,
    },
}

impl InitError {
    /// Returns the status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            InitError::SyncResourceCreationFailed { .. }
            | InitError::ThreadPoolBuildFailed { .. } => RETURN_THREAD_CREATE,
        }
    }
}

impl Display for InitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            InitError::SyncResourceCreationFailed { backend, slots } => write!(
                f,
                "[{backend}] failed to allocate synchronization resources for {slots} workers"
            ),
            InitError::ThreadPoolBuildFailed { backend, reason } => {
                write!(f, "[{backend}] failed to build the thread team: {reason}")
            }
        }
    }
}

impl Error for InitError {}

/// Failure of a run. A run that returns an error may have invoked the worker
/// function on any subset of the indices, but no worker is still running.
#[derive(Debug)]
pub enum RunError {
    /// The backend's resources were not allocated by
    /// [`initialize()`](crate::System::initialize) before this run.
    NotInitialized(Backend),
    /// No worker functions were registered for the configured category.
    MissingCallback(WorkCategory),
    /// The backend can't run the configured number of workers.
    UnsupportedWorkerCount {
        /// Backend that was asked to run.
        backend: Backend,
        /// Configured worker count.
        count: usize,
    },
    /// A worker thread couldn't be started.
    SpawnFailed {
        /// Backend that was running.
        backend: Backend,
        /// Index of the worker that couldn't be started.
        index: usize,
        /// Underlying OS error.
        source: io::Error,
    },
    /// Waiting for the workers to complete failed.
    WaitFailed {
        /// Backend that was running.
        backend: Backend,
        /// Number of workers that panicked.
        panicked: usize,
    },
}

impl RunError {
    /// Returns the status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            RunError::SpawnFailed { .. } => RETURN_THREAD_CREATE,
            RunError::WaitFailed { .. } => RETURN_THREAD_WAIT,
            RunError::NotInitialized(_)
            | RunError::MissingCallback(_)
            | RunError::UnsupportedWorkerCount { .. } => RETURN_UNKNOWN_FAULT,
        }
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RunError::NotInitialized(backend) => {
                write!(f, "[{backend}] run requested before initialization")
            }
            RunError::MissingCallback(category) => {
                write!(f, "no worker functions registered for {category}")
            }
            RunError::UnsupportedWorkerCount { backend, count } => {
                write!(f, "[{backend}] cannot run {count} workers")
            }
            RunError::SpawnFailed { backend, index, .. } => {
                write!(f, "[{backend}] failed to start worker {index}")
            }
            RunError::WaitFailed { backend, panicked } => write!(
                f,
                "[{backend}] waiting for the workers failed, {panicked} worker(s) panicked"
            ),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunError::SpawnFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
