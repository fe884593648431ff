// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Work categories and the worker functions registered for them.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A worker function, invoked once per worker index.
pub type Callback = Arc<dyn Fn(usize) + Send + Sync>;

/// Kind of job being parallelized. Each category has its own pair of worker
/// functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkCategory {
    /// Solving individual boards.
    Solve,
    /// Calculating double-dummy tables.
    Calc,
    /// Analysing played-out deals.
    Play,
}

impl WorkCategory {
    /// Number of work categories.
    pub const COUNT: usize = 3;

    /// All categories, in code order.
    pub const ALL: [WorkCategory; Self::COUNT] =
        [WorkCategory::Solve, WorkCategory::Calc, WorkCategory::Play];

    /// Numeric code of this category.
    pub fn code(self) -> u32 {
        self as u32
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u32> for WorkCategory {
    type Error = ConfigError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        WorkCategory::ALL
            .get(code as usize)
            .copied()
            .ok_or(ConfigError::InvalidCategory(code))
    }
}

impl FromStr for WorkCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkCategory::ALL
            .into_iter()
            .find(|category| format!("{category:?}").eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnrecognizedName(s.to_owned()))
    }
}

impl fmt::Display for WorkCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The two worker functions of a category: `simple` processes one unit of
/// work per index, `chunked` processes a chunk of units per index.
#[derive(Clone)]
pub struct CallbackPair {
    simple: Callback,
    chunked: Callback,
}

impl CallbackPair {
    /// Creates a pair from its two variants.
    pub fn new(
        simple: impl Fn(usize) + Send + Sync + 'static,
        chunked: impl Fn(usize) + Send + Sync + 'static,
    ) -> Self {
        Self {
            simple: Arc::new(simple),
            chunked: Arc::new(chunked),
        }
    }

    /// Selects the variant for the given chunk size: `simple` for a chunk size
    /// of exactly 1, `chunked` otherwise.
    pub fn select(&self, chunk_size: usize) -> &Callback {
        if chunk_size == 1 {
            &self.simple
        } else {
            &self.chunked
        }
    }
}

impl fmt::Debug for CallbackPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackPair").finish_non_exhaustive()
    }
}

/// Mapping from [`WorkCategory`] to its [`CallbackPair`].
#[derive(Clone, Debug, Default)]
pub struct CallbackRegistry {
    pairs: [Option<CallbackPair>; WorkCategory::COUNT],
}

impl CallbackRegistry {
    /// Registers the pair for a category, replacing any previous one.
    pub fn register(&mut self, category: WorkCategory, pair: CallbackPair) {
        self.pairs[category.index()] = Some(pair);
    }

    /// Returns the pair registered for a category.
    pub fn get(&self, category: WorkCategory) -> Option<&CallbackPair> {
        self.pairs[category.index()].as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_category_codes() {
        assert_eq!(WorkCategory::try_from(1), Ok(WorkCategory::Calc));
        assert_eq!(
            WorkCategory::try_from(3),
            Err(ConfigError::InvalidCategory(3))
        );
        assert_eq!("play".parse::<WorkCategory>(), Ok(WorkCategory::Play));
    }

    #[test]
    fn test_select_variant() {
        let simple_calls = Arc::new(AtomicUsize::new(0));
        let chunked_calls = Arc::new(AtomicUsize::new(0));
        let pair = CallbackPair::new(
            {
                let calls = simple_calls.clone();
                move |_| {
                    calls.fetch_add(1, Ordering::Relaxed);
                }
            },
            {
                let calls = chunked_calls.clone();
                move |_| {
                    calls.fetch_add(1, Ordering::Relaxed);
                }
            },
        );

        pair.select(1)(0);
        assert_eq!(simple_calls.load(Ordering::Relaxed), 1);
        assert_eq!(chunked_calls.load(Ordering::Relaxed), 0);

        pair.select(0)(0);
        pair.select(32)(0);
        assert_eq!(simple_calls.load(Ordering::Relaxed), 1);
        assert_eq!(chunked_calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_registry() {
        let mut registry = CallbackRegistry::default();
        assert!(registry.get(WorkCategory::Solve).is_none());
        registry.register(WorkCategory::Solve, CallbackPair::new(|_| (), |_| ()));
        assert!(registry.get(WorkCategory::Solve).is_some());
        assert!(registry.get(WorkCategory::Calc).is_none());
    }
}
