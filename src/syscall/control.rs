//! Process-control system calls: exec and wait
//!
//! `exit` is not here: it ends the process, so the dispatcher runs
//! [`Process::exit`] itself once the call has been decoded.

use log::debug;

use crate::kernel::Kernel;
use crate::mm::UserAddr;
use crate::process::{Pid, Process, EXIT_FAILURE};

use super::error::Fault;
use super::validate::read_user_str;

/// exec(cmdline) -> pid or -1
///
/// The command line is copied into kernel memory before the loader sees
/// it. A null or unreadable command line kills the caller.
pub fn sys_exec(kernel: &Kernel, process: &mut Process, cmdline: UserAddr) -> Result<i32, Fault> {
    let cmdline = read_user_str(process.space(), cmdline)?;
    match kernel.loader().execute(kernel.fs(), &cmdline) {
        Some(child) => {
            let pid = child.pid;
            process.adopt(child);
            Ok(pid.as_i32())
        }
        None => {
            debug!("[SYSCALL] {}: exec {:?} failed", process.pid(), cmdline);
            Ok(Pid::ERROR.as_i32())
        }
    }
}

/// wait(pid) -> exit status or -1
///
/// Only an un-reaped child can be waited for. Reaping detaches it, so a
/// second wait on the same pid returns -1.
pub fn sys_wait(process: &mut Process, pid: Pid) -> i32 {
    let Some(child) = process.reap(pid) else {
        debug!("[SYSCALL] {}: wait({}): not a waitable child", process.pid(), pid);
        return EXIT_FAILURE;
    };
    let status = child.wait();
    debug!("[SYSCALL] {}: reaped {} with status {}", process.pid(), pid, status);
    status
}
