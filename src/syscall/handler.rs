//! System Call Handler
//!
//! Dispatches system calls and writes results back to the trap frame.
//!
//! # Flow
//! ```text
//! Decode ─► ExtractArgs ─► Validate ─► Execute ─► WriteResult
//!    │           │             │           │
//!    └───────────┴─────────────┴───────────┴────► Terminated (exit -1)
//! ```
//!
//! # Security Considerations
//! - The stack pointer and every argument word are validated before use
//! - Unknown syscall numbers kill the caller
//! - Pointer arguments are validated by each handler before use
//! - Any [`Fault`] ends in `exit(-1)`, never in a partial result

use log::warn;

use crate::kernel::Kernel;
use crate::mm::UserAddr;
use crate::process::{Process, EXIT_FAILURE};
use crate::trap::TrapFrame;

use super::args::{self, Word};
use super::error::Fault;
use super::numbers::{self, Syscall};
use super::{control, file};

/// What the trap entry must do after a system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Return to the calling process.
    Resume,
    /// The process has exited with this status and must not run again.
    Exited(i32),
}

/// Outcome of a successfully executed call.
enum Completion {
    /// Store this word in the result register.
    Value(i32),
    /// Nothing to store.
    Done,
    /// The process asked to exit.
    Exit(i32),
}

/// Dispatch a system call
///
/// # Arguments
/// * `kernel` - Shared kernel services
/// * `process` - The calling process
/// * `frame` - Saved user registers; `esp` points at the syscall number
///
/// # Returns
/// Whether the process continues. When it does not, [`Process::exit`] has
/// already run.
pub fn dispatch(kernel: &Kernel, process: &mut Process, frame: &mut TrapFrame) -> Disposition {
    match execute(kernel, process, UserAddr::new(frame.esp)) {
        Ok(Completion::Value(value)) => {
            frame.eax = value as Word;
            Disposition::Resume
        }
        Ok(Completion::Done) => Disposition::Resume,
        Ok(Completion::Exit(status)) => Disposition::Exited(process.exit(kernel, status)),
        Err(fault) => {
            warn!(
                "[SYSCALL] {} ({}) killed: {}",
                process.name(),
                process.pid(),
                fault
            );
            Disposition::Exited(process.exit(kernel, EXIT_FAILURE))
        }
    }
}

fn execute(kernel: &Kernel, process: &mut Process, sp: UserAddr) -> Result<Completion, Fault> {
    let nr = args::read_word(process.space(), sp)?;
    let arity = numbers::arity(nr).ok_or(Fault::UnknownSyscall(nr))?;
    let words = args::extract(process.space(), sp, arity)?;
    let call = Syscall::decode(nr, &words).ok_or(Fault::UnknownSyscall(nr))?;

    #[cfg(feature = "syscall-trace")]
    log::trace!("[SYSCALL] {}: {:?}", process.pid(), call);

    let completion = match call {
        Syscall::Halt => kernel.power().power_off(),
        Syscall::Exit { status } => Completion::Exit(status),
        Syscall::Exec { cmdline } => {
            Completion::Value(control::sys_exec(kernel, process, cmdline)?)
        }
        Syscall::Wait { pid } => Completion::Value(control::sys_wait(process, pid)),
        Syscall::Create { name, initial_size } => {
            Completion::Value(file::sys_create(kernel, process, name, initial_size)?)
        }
        Syscall::Remove { name } => Completion::Value(file::sys_remove(kernel, process, name)?),
        Syscall::Open { name } => Completion::Value(file::sys_open(kernel, process, name)?),
        Syscall::Filesize { fd } => Completion::Value(file::sys_filesize(kernel, process, fd)?),
        Syscall::Read { fd, buf, size } => {
            Completion::Value(file::sys_read(kernel, process, fd, buf, size)?)
        }
        Syscall::Write { fd, buf, size } => {
            Completion::Value(file::sys_write(kernel, process, fd, buf, size)?)
        }
        Syscall::Seek { fd, position } => {
            file::sys_seek(kernel, process, fd, position)?;
            Completion::Done
        }
        Syscall::Tell { fd } => Completion::Value(file::sys_tell(kernel, process, fd)?),
        Syscall::Close { fd } => {
            file::sys_close(kernel, process, fd)?;
            Completion::Done
        }
    };
    debug_assert_eq!(
        matches!(completion, Completion::Value(_)),
        call.has_result()
    );
    Ok(completion)
}
