// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Detached OS threads, each claiming its index from a shared counter and
//! reporting completion through its own signal.

use super::Strategy;
use crate::capability::Backend;
use crate::error::{InitError, RunError};
use crate::macros::{log_debug, log_error, log_trace};
use crate::registry::Callback;
use crate::sync::{Completion, CompletionSignal};
use crate::system::MAX_WORKERS;
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
pub struct NativeThreads {
    /// One completion signal per worker slot, allocated by `init()` and
    /// released at the end of the next run.
    signals: Option<Arc<[CompletionSignal]>>,
}

impl Strategy for NativeThreads {
    fn init(&mut self, num_threads: usize) -> Result<(), InitError> {
        let failed = || InitError::SyncResourceCreationFailed {
            backend: Backend::NativeThreads,
            slots: num_threads,
        };
        if num_threads >= MAX_WORKERS {
            return Err(failed());
        }

        let mut signals = Vec::new();
        signals.try_reserve_exact(num_threads).map_err(|_| failed())?;
        signals.extend((0..num_threads).map(|_| CompletionSignal::new()));
        self.signals = Some(signals.into());
        log_debug!("[{}] Allocated {num_threads} completion signals", Backend::NativeThreads);
        Ok(())
    }

    fn run_all(&mut self, num_threads: usize, callback: &Callback) -> Result<(), RunError> {
        // The signals are dropped on every path out of this function.
        let signals = match self.signals.take() {
            Some(signals) if signals.len() == num_threads => signals,
            _ => return Err(RunError::NotInitialized(Backend::NativeThreads)),
        };
        let next_index = Arc::new(CachePadded::new(AtomicUsize::new(0)));

        let mut spawned = 0;
        let mut spawn_error = None;
        for k in 0..num_threads {
            let work_item = WorkItem {
                next_index: next_index.clone(),
                signals: signals.clone(),
                callback: callback.clone(),
            };
            let spawn = std::thread::Builder::new()
                .name(format!("dealpar-native-{k}"))
                .spawn(move || work_item.run());
            match spawn {
                // Detached: completion is observed through the signals only.
                Ok(_handle) => spawned += 1,
                Err(e) => {
                    log_error!("[{}] Failed to spawn work item {k}: {e}", Backend::NativeThreads);
                    spawn_error = Some((k, e));
                    break;
                }
            }
        }

        // The `spawned` work items claim exactly the indices `0..spawned`, so
        // these are the signals to wait for.
        log_debug!("[{}] Waiting for {spawned} work items", Backend::NativeThreads);
        let mut panicked = 0;
        let mut poisoned = 0;
        for signal in &signals[..spawned] {
            match signal.wait() {
                Some(Completion::Panicked) => panicked += 1,
                Some(_) => (),
                None => poisoned += 1,
            }
        }
        drop(signals);

        if let Some((index, source)) = spawn_error {
            return Err(RunError::SpawnFailed {
                backend: Backend::NativeThreads,
                index,
                source,
            });
        }
        if panicked != 0 || poisoned != 0 {
            log_error!(
                "[{}] {panicked} work item(s) panicked, {poisoned} signal(s) poisoned",
                Backend::NativeThreads
            );
            return Err(RunError::WaitFailed {
                backend: Backend::NativeThreads,
                panicked,
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        self.signals = None;
    }
}

/// Context moved into one detached work item.
struct WorkItem {
    next_index: Arc<CachePadded<AtomicUsize>>,
    signals: Arc<[CompletionSignal]>,
    callback: Callback,
}

impl WorkItem {
    fn run(self) {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        log_trace!("[{}] Work item claimed index {index}", Backend::NativeThreads);
        // Set on drop, including when the callback unwinds.
        let _guard = self.signals[index].guard();
        consume(self.callback, index);
    }
}

/// Invokes the callback and drops this reference to it, before the caller's
/// completion guard fires.
fn consume(callback: Callback, index: usize) {
    callback(index)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Mutex;

    fn counting_callback(num_threads: usize) -> (Callback, Arc<Mutex<Vec<usize>>>) {
        let counts = Arc::new(Mutex::new(vec![0; num_threads]));
        let callback: Callback = Arc::new({
            let counts = counts.clone();
            move |index| counts.lock().unwrap()[index] += 1
        });
        (callback, counts)
    }

    #[test]
    fn test_each_index_once() {
        let mut strategy = NativeThreads::default();
        for num_threads in 1..MAX_WORKERS {
            let (callback, counts) = counting_callback(num_threads);
            strategy.init(num_threads).unwrap();
            strategy.run_all(num_threads, &callback).unwrap();
            assert!(counts.lock().unwrap().iter().all(|&count| count == 1));
        }
    }

    #[test]
    fn test_signals_released_after_run() {
        let mut strategy = NativeThreads::default();
        let (callback, _counts) = counting_callback(3);
        strategy.init(3).unwrap();
        strategy.run_all(3, &callback).unwrap();
        assert!(strategy.signals.is_none());
        assert!(matches!(
            strategy.run_all(3, &callback),
            Err(RunError::NotInitialized(Backend::NativeThreads))
        ));
    }

    #[test]
    fn test_callback_released_before_return() {
        let mut strategy = NativeThreads::default();
        for num_threads in [1, 4, MAX_WORKERS - 1] {
            let (callback, _counts) = counting_callback(num_threads);
            strategy.init(num_threads).unwrap();
            strategy.run_all(num_threads, &callback).unwrap();
            assert_eq!(Arc::strong_count(&callback), 1);
        }

        let callback: Callback = Arc::new(|_| panic!("board panic"));
        strategy.init(2).unwrap();
        assert!(strategy.run_all(2, &callback).is_err());
        assert_eq!(Arc::strong_count(&callback), 1);
    }

    #[test]
    fn test_count_mismatch() {
        let mut strategy = NativeThreads::default();
        let (callback, counts) = counting_callback(4);
        strategy.init(2).unwrap();
        assert!(matches!(
            strategy.run_all(4, &callback),
            Err(RunError::NotInitialized(Backend::NativeThreads))
        ));
        assert!(counts.lock().unwrap().iter().all(|&count| count == 0));
    }

    #[test]
    fn test_too_many_slots() {
        let mut strategy = NativeThreads::default();
        assert!(matches!(
            strategy.init(MAX_WORKERS),
            Err(InitError::SyncResourceCreationFailed { slots: MAX_WORKERS, .. })
        ));
    }

    #[test]
    fn test_panic_waits_for_all() {
        let mut strategy = NativeThreads::default();
        let (counting, counts) = counting_callback(4);
        let callback: Callback = Arc::new(move |index| {
            counting(index);
            if index == 2 {
                panic!("board panic");
            }
        });
        strategy.init(4).unwrap();
        assert!(matches!(
            strategy.run_all(4, &callback),
            Err(RunError::WaitFailed { panicked: 1, .. })
        ));
        assert!(counts.lock().unwrap().iter().all(|&count| count == 1));
    }
}
