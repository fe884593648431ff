// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Human-readable report of the build, platform and threading setup.

use crate::capability::{Backend, Capabilities};
use std::fmt::{self, Display, Formatter};

/// Version of this library.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl Version {
    /// Returns the version of this build.
    pub fn current() -> Self {
        Self {
            major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
            minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
            patch: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Snapshot of the build and of a [`System`](crate::System)'s threading setup,
/// as returned by [`System::describe()`](crate::System::describe).
///
/// The [`Display`] implementation renders a two-column report:
///
/// ```text
/// dealpar 0.1.0
/// -------------
/// System                      Linux
/// Compiler                    rustc
/// Constructor          On first use
/// Threading    None(*) Threads Pool
/// Workers                         1
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SystemInfo {
    /// Version of this library.
    pub version: Version,
    /// Operating system family.
    pub platform: &'static str,
    /// Kernel release, where the platform reports it.
    pub kernel_release: Option<String>,
    /// Compiler that built this library.
    pub compiler: &'static str,
    /// How the process-wide state is constructed.
    pub construction: &'static str,
    /// Backends available to the system, in code order.
    pub backends: Vec<Backend>,
    /// Preferred backend of the system.
    pub preferred: Backend,
    /// Configured number of workers.
    pub num_threads: usize,
}

impl SystemInfo {
    pub(crate) fn new(capabilities: &Capabilities, preferred: Backend, num_threads: usize) -> Self {
        Self {
            version: Version::current(),
            platform: platform_name(),
            kernel_release: kernel_release(),
            compiler: "rustc",
            construction: "On first use",
            backends: capabilities.iter().collect(),
            preferred,
            num_threads,
        }
    }

    /// Lists the available backends, marking the preferred one with `(*)`.
    pub fn threading(&self) -> String {
        let mut threading = String::new();
        for backend in &self.backends {
            threading.push(' ');
            threading.push_str(backend.name());
            if *backend == self.preferred {
                threading.push_str("(*)");
            }
        }
        threading
    }
}

impl Display for SystemInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let title = format!("dealpar {}", self.version);
        writeln!(f, "{title}")?;
        writeln!(f, "{}", "-".repeat(title.len()))?;

        let platform = match &self.kernel_release {
            Some(release) => format!("{} {release}", self.platform),
            None => self.platform.to_owned(),
        };
        writeln!(f, "{:<13}{:>20}", "System", platform)?;
        writeln!(f, "{:<13}{:>20}", "Compiler", self.compiler)?;
        writeln!(f, "{:<13}{:>20}", "Constructor", self.construction)?;
        writeln!(f, "{:<9}{:>24}", "Threading", self.threading())?;
        writeln!(f, "{:<13}{:>20}", "Workers", self.num_threads)
    }
}

fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "windows" => "Windows",
        "linux" => "Linux",
        "macos" | "ios" => "Apple",
        "" => "Unknown",
        other => other,
    }
}

#[cfg(any(
    target_os = "android",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "linux"
))]
fn kernel_release() -> Option<String> {
    nix::sys::utsname::uname()
        .ok()
        .map(|uts| uts.release().to_string_lossy().into_owned())
}

#[cfg(not(any(
    target_os = "android",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "linux"
)))]
fn kernel_release() -> Option<String> {
    None
}
