// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! One owned thread per index, joined in index order.

use super::Strategy;
use crate::capability::Backend;
use crate::error::{InitError, RunError};
use crate::macros::{log_debug, log_error};
use crate::registry::Callback;
use std::thread::JoinHandle;

#[derive(Default)]
pub struct LibraryThreadPool {
    /// Thread handles, pre-sized by `init()` and consumed by the next run.
    threads: Option<ThreadSlots>,
}

struct ThreadSlots {
    /// Number of workers these slots were sized for.
    num_threads: usize,
    /// Handles to the spawned threads, in index order.
    handles: Vec<JoinHandle<()>>,
}

impl Strategy for LibraryThreadPool {
    fn init(&mut self, num_threads: usize) -> Result<(), InitError> {
        let mut handles = Vec::new();
        handles
            .try_reserve_exact(num_threads)
            .map_err(|_| InitError::SyncResourceCreationFailed {
                backend: Backend::LibraryThreadPool,
                slots: num_threads,
            })?;
        self.threads = Some(ThreadSlots {
            num_threads,
            handles,
        });
        Ok(())
    }

    fn run_all(&mut self, num_threads: usize, callback: &Callback) -> Result<(), RunError> {
        let ThreadSlots { mut handles, .. } = match self.threads.take() {
            Some(slots) if slots.num_threads == num_threads => slots,
            _ => return Err(RunError::NotInitialized(Backend::LibraryThreadPool)),
        };

        let mut spawn_error = None;
        for index in 0..num_threads {
            let callback = callback.clone();
            let spawn = std::thread::Builder::new()
                .name(format!("dealpar-pool-{index}"))
                .spawn(move || callback(index));
            match spawn {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    log_error!(
                        "[{}] Failed to spawn thread {index}: {e}",
                        Backend::LibraryThreadPool
                    );
                    spawn_error = Some((index, e));
                    break;
                }
            }
        }

        // Joining consumes each handle, so every thread is released exactly once.
        log_debug!("[{}] Joining {} threads...", Backend::LibraryThreadPool, handles.len());
        let mut panicked = 0;
        for (_index, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() {
                log_error!("[{}] Thread {_index} panicked", Backend::LibraryThreadPool);
                panicked += 1;
            }
        }

        if let Some((index, source)) = spawn_error {
            return Err(RunError::SpawnFailed {
                backend: Backend::LibraryThreadPool,
                index,
                source,
            });
        }
        if panicked != 0 {
            return Err(RunError::WaitFailed {
                backend: Backend::LibraryThreadPool,
                panicked,
            });
        }
        Ok(())
    }

    fn release(&mut self) {
        self.threads = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::system::MAX_WORKERS;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_each_index_once() {
        let mut strategy = LibraryThreadPool::default();
        for num_threads in 1..MAX_WORKERS {
            let counts = Arc::new(Mutex::new(vec![0; num_threads]));
            let callback: Callback = Arc::new({
                let counts = counts.clone();
                move |index| counts.lock().unwrap()[index] += 1
            });
            strategy.init(num_threads).unwrap();
            strategy.run_all(num_threads, &callback).unwrap();
            assert!(counts.lock().unwrap().iter().all(|&count| count == 1));
        }
    }

    #[test]
    fn test_init_presizes_handles() {
        let mut strategy = LibraryThreadPool::default();
        strategy.init(7).unwrap();
        let slots = strategy.threads.as_ref().unwrap();
        assert_eq!(slots.num_threads, 7);
        assert!(slots.handles.capacity() >= 7);
        assert!(slots.handles.is_empty());
    }

    #[test]
    fn test_thread_names_match_indices() {
        let mut strategy = LibraryThreadPool::default();
        let names = Arc::new(Mutex::new(vec![String::new(); 3]));
        let callback: Callback = Arc::new({
            let names = names.clone();
            move |index| {
                names.lock().unwrap()[index] =
                    std::thread::current().name().unwrap_or_default().to_owned();
            }
        });
        strategy.init(3).unwrap();
        strategy.run_all(3, &callback).unwrap();
        assert_eq!(
            *names.lock().unwrap(),
            ["dealpar-pool-0", "dealpar-pool-1", "dealpar-pool-2"]
        );
    }

    #[test]
    fn test_panic_is_joined() {
        let mut strategy = LibraryThreadPool::default();
        let callback: Callback = Arc::new(|index| {
            if index == 1 {
                panic!("board panic");
            }
        });
        strategy.init(3).unwrap();
        assert!(matches!(
            strategy.run_all(3, &callback),
            Err(RunError::WaitFailed { panicked: 1, .. })
        ));
        assert!(strategy.threads.is_none());
    }
}
