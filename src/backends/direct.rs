// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Single-worker fallback running on the caller's thread.

use super::{invoke, Strategy};
use crate::capability::Backend;
use crate::error::{InitError, RunError};
use crate::registry::Callback;

pub struct Direct;

impl Strategy for Direct {
    fn init(&mut self, _num_threads: usize) -> Result<(), InitError> {
        Ok(())
    }

    fn run_all(&mut self, num_threads: usize, callback: &Callback) -> Result<(), RunError> {
        if num_threads != 1 {
            return Err(RunError::UnsupportedWorkerCount {
                backend: Backend::Direct,
                count: num_threads,
            });
        }
        if invoke(callback, 0) {
            return Err(RunError::WaitFailed {
                backend: Backend::Direct,
                panicked: 1,
            });
        }
        Ok(())
    }
}
