// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![doc = include_str!("../README.md")]
#![forbid(missing_docs, unsafe_code)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod backends;
mod capability;
mod error;
mod info;
mod macros;
mod registry;
mod sync;
mod system;

pub use capability::{Backend, Capabilities};
pub use error::{
    ConfigError, InitError, RunError, RETURN_THREAD_CREATE, RETURN_THREAD_INDEX,
    RETURN_THREAD_MISSING, RETURN_THREAD_WAIT, RETURN_UNKNOWN_FAULT,
};
pub use info::{SystemInfo, Version};
pub use registry::{Callback, CallbackPair, CallbackRegistry, WorkCategory};
pub use system::{System, SystemBuilder, ThreadCount, MAX_WORKERS};
