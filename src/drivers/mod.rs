//! Device boundary for the syscall layer
//!
//! The console and the power switch are collaborators: the syscall layer
//! only uses the traits below. On QEMU virt they are backed by the PL011
//! UART and PSCI.
//!
//! All drivers follow these security principles:
//! - Minimal unsafe code, well-documented
//! - No panics on invalid input

pub mod logger;
pub mod power;
pub mod uart;

/// The console device behind descriptors 0 and 1.
pub trait Console: Send + Sync {
    /// Block until a key is available and return it.
    fn get_char(&self) -> u8;

    /// Write `bytes` as one unit; output from other writers never
    /// interleaves with it.
    fn put_buffer(&self, bytes: &[u8]);
}

/// Machine power control.
pub trait Power: Send + Sync {
    /// Turn the machine off. Never returns.
    fn power_off(&self) -> !;
}
