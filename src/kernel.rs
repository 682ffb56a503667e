//! Kernel-wide Services
//!
//! [`Kernel`] bundles the state every system call shares: the filesystem
//! lock and the console, loader and power collaborators. It is built once;
//! the trap entry reaches it through [`get`] after boot calls [`init`].
//!
//! Tests build private `Kernel` values instead of using the global.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use log::info;
use spin::Once;

use crate::drivers::{Console, Power};
use crate::fs::{Filesystem, FsLock};
use crate::process::Loader;

/// Shared state of the syscall layer.
pub struct Kernel {
    fs: FsLock,
    console: Arc<dyn Console>,
    loader: Arc<dyn Loader>,
    power: Arc<dyn Power>,
}

impl Kernel {
    /// Assemble the kernel services. The filesystem lock is created here
    /// and nowhere else.
    pub fn new(
        fs: Box<dyn Filesystem>,
        console: Arc<dyn Console>,
        loader: Arc<dyn Loader>,
        power: Arc<dyn Power>,
    ) -> Self {
        Self {
            fs: FsLock::new(fs),
            console,
            loader,
            power,
        }
    }

    /// The filesystem lock.
    pub fn fs(&self) -> &FsLock {
        &self.fs
    }

    /// The console device.
    pub fn console(&self) -> &dyn Console {
        &*self.console
    }

    /// The program loader.
    pub fn loader(&self) -> &dyn Loader {
        &*self.loader
    }

    /// The power switch.
    pub fn power(&self) -> &dyn Power {
        &*self.power
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel").field("fs", &self.fs).finish()
    }
}

/// Error type for kernel initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// `init` already ran.
    AlreadyInitialized,
    /// A system call arrived before `init`.
    NotInitialized,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInitialized => write!(f, "syscall layer already initialized"),
            Self::NotInitialized => write!(f, "syscall layer not initialized"),
        }
    }
}

static KERNEL: Once<Kernel> = Once::new();

/// Install the global kernel services.
///
/// Must run once during boot, before the first user program starts. A
/// second call is rejected and leaves the installed services (and any
/// waiters on the filesystem lock) untouched.
pub fn init(kernel: Kernel) -> Result<&'static Kernel, InitError> {
    let mut installed = false;
    let global = KERNEL.call_once(|| {
        installed = true;
        kernel
    });
    if installed {
        info!("[BOOT] Syscall layer initialized");
        Ok(global)
    } else {
        Err(InitError::AlreadyInitialized)
    }
}

/// The global kernel services.
pub fn get() -> Result<&'static Kernel, InitError> {
    KERNEL.get().ok_or(InitError::NotInitialized)
}
