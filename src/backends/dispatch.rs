// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Parallel apply of the worker function over the index range, on Rayon's
//! global thread pool.

use super::{invoke, Strategy};
use crate::capability::Backend;
use crate::error::{InitError, RunError};
use crate::macros::{log_debug, log_error};
use crate::registry::Callback;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct DispatchQueue;

impl Strategy for DispatchQueue {
    fn init(&mut self, _num_threads: usize) -> Result<(), InitError> {
        Ok(())
    }

    fn run_all(&mut self, num_threads: usize, callback: &Callback) -> Result<(), RunError> {
        log_debug!(
            "[{}] Applying {num_threads} workers on the global pool of {} threads",
            Backend::DispatchQueue,
            rayon_core::current_num_threads()
        );

        let panicked = AtomicUsize::new(0);
        let panicked_ref = &panicked;
        // The scope only returns once every spawned index has completed.
        rayon_core::scope(|scope| {
            for index in 0..num_threads {
                scope.spawn(move |_| {
                    if invoke(callback, index) {
                        panicked_ref.fetch_add(1, Ordering::Relaxed);
                    }
                });
            }
        });

        let panicked = panicked.into_inner();
        if panicked != 0 {
            log_error!("[{}] {panicked} worker(s) panicked", Backend::DispatchQueue);
            return Err(RunError::WaitFailed {
                backend: Backend::DispatchQueue,
                panicked,
            });
        }
        Ok(())
    }
}
