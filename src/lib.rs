//! PantherOS user-program layer
//!
//! The privileged boundary between user programs and the kernel:
//! system-call dispatch, validation of every user address, per-process
//! file descriptors, and the exit/wait protocol between parent and child.
//!
//! # Security Features
//! - User pointers are numbers until validated against the address space
//! - Every failed validation kills the offending process, not the kernel
//! - One filesystem lock, created once, serializes all file access
//! - A running program's image cannot be written through any descriptor
//!
//! # Collaborators
//! Boot, scheduling, the on-disk filesystem and program loading live
//! elsewhere; this crate reaches them through the traits in [`drivers`],
//! [`fs`], [`mm`] and [`process`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod drivers;
pub mod fs;
pub mod kernel;
pub mod mm;
pub mod process;
pub mod sync;
pub mod syscall;
pub mod trap;

#[cfg(test)]
mod testing;

use log::LevelFilter;

use drivers::logger;
use kernel::{InitError, Kernel};

/// Bring up the syscall layer.
///
/// Installs the console logger and the global kernel services, and
/// registers the scheduler's yield hook used by blocking primitives.
/// Must run once, before the first user program starts.
pub fn init(kernel: Kernel, yield_hook: fn()) -> Result<&'static Kernel, InitError> {
    // A logger installed earlier in boot is fine.
    let _ = logger::init(LevelFilter::Info);
    sync::set_yield_hook(yield_hook);
    kernel::init(kernel)
}
