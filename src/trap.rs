//! System Call Trap Entry
//!
//! The architecture's trap stub saves the user registers into a
//! [`TrapFrame`], finds the current process, and calls
//! [`handle_syscall_trap`]. Whatever the handler leaves in `eax` is
//! restored into the user's result register on return.
//!
//! # Security Considerations
//! - Only `esp` is read from the frame; it is validated like any other
//!   user pointer before the syscall number is fetched
//! - A process that exited must be descheduled, never resumed

use log::error;

use crate::kernel::{self, InitError};
use crate::process::Process;
use crate::syscall::{self, Disposition};

/// Saved user register state relevant to system calls.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// User stack pointer at the trap; points at the syscall number.
    pub esp: u32,
    /// Result register.
    pub eax: u32,
}

impl TrapFrame {
    /// Frame for a trap with the given user stack pointer.
    pub const fn new(esp: u32) -> Self {
        Self { esp, eax: 0 }
    }
}

/// Entry point for the syscall trap.
///
/// # Returns
/// What the scheduler must do with `process`, or an error if the syscall
/// layer has not been initialized yet.
pub fn handle_syscall_trap(
    process: &mut Process,
    frame: &mut TrapFrame,
) -> Result<Disposition, InitError> {
    let kernel = kernel::get().map_err(|err| {
        error!("[TRAP] syscall from {} before init", process.pid());
        err
    })?;
    Ok(syscall::dispatch(kernel, process, frame))
}
