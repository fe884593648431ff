// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Threading backends and the table of which ones this build can use.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Mechanism used to run the indexed workers of a [`System`](crate::System).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Calls the worker function directly on the caller's thread. Only valid
    /// with a single worker.
    Direct,
    /// Spawns one detached OS thread per worker and waits on per-worker
    /// completion signals.
    NativeThreads,
    /// Runs a parallel region on a dedicated team of exactly `num_threads`
    /// threads, which claim indices from a shared counter.
    CompilerParallel,
    /// Applies the worker function over the index range on the shared global
    /// pool.
    DispatchQueue,
    /// Spawns one thread per index and joins them in index order.
    LibraryThreadPool,
}

impl Backend {
    /// Number of backends.
    pub const COUNT: usize = 5;

    /// All backends, in code order.
    pub const ALL: [Backend; Self::COUNT] = [
        Backend::Direct,
        Backend::NativeThreads,
        Backend::CompilerParallel,
        Backend::DispatchQueue,
        Backend::LibraryThreadPool,
    ];

    /// Numeric code of this backend.
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Short name, as shown in [`SystemInfo`](crate::SystemInfo) reports.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Direct => "None",
            Backend::NativeThreads => "Threads",
            Backend::CompilerParallel => "Parallel",
            Backend::DispatchQueue => "Dispatch",
            Backend::LibraryThreadPool => "Pool",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for Backend {
    type Error = ConfigError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Backend::ALL
            .get(code as usize)
            .copied()
            .ok_or(ConfigError::UnknownBackend(code))
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|backend| backend.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnrecognizedName(s.to_owned()))
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which [`Backend`]s are usable in this process.
///
/// The process-wide table is computed once by [`Capabilities::global()`] from
/// the enabled cargo features and the target platform. Hardware is never
/// probed. Other tables can be built explicitly, e.g. to restrict a
/// [`System`](crate::System) to a subset of the backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capabilities {
    available: [bool; Backend::COUNT],
}

impl Capabilities {
    /// Detects the backends supported by this build.
    pub fn detect() -> Self {
        let os_threads = cfg!(any(unix, windows));
        let rayon = cfg!(feature = "rayon");

        let mut available = [false; Backend::COUNT];
        available[Backend::Direct.index()] = true;
        available[Backend::NativeThreads.index()] = os_threads;
        available[Backend::CompilerParallel.index()] = rayon;
        available[Backend::DispatchQueue.index()] = rayon;
        available[Backend::LibraryThreadPool.index()] = os_threads;
        Self { available }
    }

    /// Returns the table detected for this process. The detection runs once,
    /// on first use.
    pub fn global() -> Capabilities {
        static GLOBAL: OnceLock<Capabilities> = OnceLock::new();
        *GLOBAL.get_or_init(Capabilities::detect)
    }

    /// Builds a table where only the given backends are available.
    /// [`Backend::Direct`] is always available.
    pub fn only(backends: impl IntoIterator<Item = Backend>) -> Self {
        let mut available = [false; Backend::COUNT];
        available[Backend::Direct.index()] = true;
        for backend in backends {
            available[backend.index()] = true;
        }
        Self { available }
    }

    /// Returns whether the given backend can be used.
    pub fn is_available(&self, backend: Backend) -> bool {
        self.available[backend.index()]
    }

    /// Iterates over the available backends, in code order.
    pub fn iter(&self) -> impl Iterator<Item = Backend> + '_ {
        Backend::ALL
            .into_iter()
            .filter(move |backend| self.is_available(*backend))
    }

    /// Restricts this table to the backends also available in `other`.
    pub(crate) fn intersect(self, other: Capabilities) -> Self {
        let mut available = self.available;
        for (a, b) in available.iter_mut().zip(other.available) {
            *a &= b;
        }
        Self { available }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_backend_codes() {
        for (i, backend) in Backend::ALL.into_iter().enumerate() {
            assert_eq!(backend.code(), i as u32);
            assert_eq!(Backend::try_from(i as u32), Ok(backend));
        }
        assert_eq!(Backend::try_from(5), Err(ConfigError::UnknownBackend(5)));
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("threads".parse::<Backend>(), Ok(Backend::NativeThreads));
        assert_eq!("Pool".parse::<Backend>(), Ok(Backend::LibraryThreadPool));
        assert_eq!(
            "openmp".parse::<Backend>(),
            Err(ConfigError::UnrecognizedName("openmp".to_owned()))
        );
    }

    #[test]
    fn test_detect() {
        let caps = Capabilities::detect();
        assert!(caps.is_available(Backend::Direct));
        assert_eq!(
            caps.is_available(Backend::CompilerParallel),
            cfg!(feature = "rayon")
        );
        assert_eq!(
            caps.is_available(Backend::DispatchQueue),
            cfg!(feature = "rayon")
        );
        assert_eq!(Capabilities::global(), caps);
    }

    #[test]
    fn test_only() {
        let caps = Capabilities::only([Backend::LibraryThreadPool]);
        assert_eq!(
            caps.iter().collect::<Vec<_>>(),
            [Backend::Direct, Backend::LibraryThreadPool]
        );
        assert_eq!(
            Capabilities::only([]).iter().collect::<Vec<_>>(),
            [Backend::Direct]
        );
    }

    #[test]
    fn test_intersect() {
        let caps = Capabilities::only([Backend::NativeThreads, Backend::DispatchQueue])
            .intersect(Capabilities::only([Backend::NativeThreads]));
        assert!(caps.is_available(Backend::NativeThreads));
        assert!(!caps.is_available(Backend::DispatchQueue));
    }
}
