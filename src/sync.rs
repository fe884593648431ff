// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Synchronization primitives

use crate::macros::log_error;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// An ergonomic wrapper around a [`Mutex`]-[`Condvar`] pair.
pub struct Status<T> {
    mutex: Mutex<T>,
    condvar: Condvar,
}

impl<T> Status<T> {
    /// Creates a new status initialized with the given value.
    pub fn new(t: T) -> Self {
        Self {
            mutex: Mutex::new(t),
            condvar: Condvar::new(),
        }
    }

    /// Attempts to set the status to the given value and notifies all waiting
    /// threads.
    ///
    /// Fails if the [`Mutex`] is poisoned.
    pub fn try_notify_all(&self, t: T) -> Result<(), PoisonError<MutexGuard<'_, T>>> {
        *self.mutex.lock()? = t;
        self.condvar.notify_all();
        Ok(())
    }

    /// Waits until the predicate is false on this status.
    ///
    /// Fails if the [`Mutex`] is poisoned.
    pub fn try_wait_while(
        &self,
        predicate: impl FnMut(&mut T) -> bool,
    ) -> Result<MutexGuard<'_, T>, PoisonError<MutexGuard<'_, T>>> {
        self.condvar.wait_while(self.mutex.lock()?, predicate)
    }
}

/// Outcome reported by a worker through its [`CompletionSignal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// The worker hasn't finished yet.
    Pending,
    /// The worker function returned.
    Done,
    /// The worker function panicked.
    Panicked,
}

/// A one-shot signal set by a worker when it's done, and awaited by the
/// thread that started it.
pub struct CompletionSignal {
    status: Status<Completion>,
}

impl CompletionSignal {
    /// Creates a pending signal.
    pub fn new() -> Self {
        Self {
            status: Status::new(Completion::Pending),
        }
    }

    /// Returns a guard that sets this signal when dropped, reporting
    /// [`Completion::Panicked`] if the thread is unwinding at that point.
    pub fn guard(&self) -> SignalGuard<'_> {
        SignalGuard { signal: self }
    }

    /// Blocks until the signal is set, and returns the reported outcome.
    ///
    /// Returns [`None`] if the underlying mutex was poisoned.
    pub fn wait(&self) -> Option<Completion> {
        self.status
            .try_wait_while(|completion| *completion == Completion::Pending)
            .ok()
            .map(|guard| *guard)
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets a [`CompletionSignal`] when dropped, whether the worker function
/// returned or panicked.
pub struct SignalGuard<'a> {
    signal: &'a CompletionSignal,
}

impl Drop for SignalGuard<'_> {
    fn drop(&mut self) {
        let completion = if std::thread::panicking() {
            Completion::Panicked
        } else {
            Completion::Done
        };
        if let Err(_e) = self.signal.status.try_notify_all(completion) {
            // The waiting side observes the poisoned mutex and fails the wait.
            log_error!("Failed to set the completion signal, the mutex was poisoned: {_e:?}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_signal_done() {
        let signal = Arc::new(CompletionSignal::new());
        let handle = std::thread::spawn({
            let signal = signal.clone();
            move || {
                let _guard = signal.guard();
            }
        });
        assert_eq!(signal.wait(), Some(Completion::Done));
        handle.join().unwrap();
    }

    #[test]
    fn test_signal_panicked() {
        let signal = Arc::new(CompletionSignal::new());
        let handle = std::thread::spawn({
            let signal = signal.clone();
            move || {
                let _guard = signal.guard();
                panic!("worker panic");
            }
        });
        assert_eq!(signal.wait(), Some(Completion::Panicked));
        assert!(handle.join().is_err());
    }

    #[test]
    fn test_status_wait_while() {
        let status = Arc::new(Status::new(0));
        let handle = std::thread::spawn({
            let status = status.clone();
            move || {
                for i in 1..=3 {
                    status.try_notify_all(i).unwrap();
                }
            }
        });
        let guard = status.try_wait_while(|value| *value < 3).unwrap();
        assert_eq!(*guard, 3);
        drop(guard);
        handle.join().unwrap();
    }
}
