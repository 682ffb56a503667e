//! System call numbers and decoding
//!
//! Numbers are the user ABI and must not change. Each number has a fixed
//! arity; [`Syscall::decode`] turns the raw words into a typed request.

use core::fmt;

use crate::mm::UserAddr;
use crate::process::Pid;

use super::args::{Word, MAX_ARGS};

pub const SYS_HALT: u32 = 0;
pub const SYS_EXIT: u32 = 1;
pub const SYS_EXEC: u32 = 2;
pub const SYS_WAIT: u32 = 3;
pub const SYS_CREATE: u32 = 4;
pub const SYS_REMOVE: u32 = 5;
pub const SYS_OPEN: u32 = 6;
pub const SYS_FILESIZE: u32 = 7;
pub const SYS_READ: u32 = 8;
pub const SYS_WRITE: u32 = 9;
pub const SYS_SEEK: u32 = 10;
pub const SYS_TELL: u32 = 11;
pub const SYS_CLOSE: u32 = 12;

/// Number of argument words taken by system call `nr`.
pub const fn arity(nr: u32) -> Option<usize> {
    match nr {
        SYS_HALT => Some(0),
        SYS_EXIT | SYS_EXEC | SYS_WAIT | SYS_REMOVE | SYS_OPEN | SYS_FILESIZE | SYS_TELL
        | SYS_CLOSE => Some(1),
        SYS_CREATE | SYS_SEEK => Some(2),
        SYS_READ | SYS_WRITE => Some(3),
        _ => None,
    }
}

/// A decoded system call request.
///
/// Pointer arguments are still raw user addresses here; they are validated
/// by the handler for the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit { status: i32 },
    Exec { cmdline: UserAddr },
    Wait { pid: Pid },
    Create { name: UserAddr, initial_size: u32 },
    Remove { name: UserAddr },
    Open { name: UserAddr },
    Filesize { fd: i32 },
    Read { fd: i32, buf: UserAddr, size: u32 },
    Write { fd: i32, buf: UserAddr, size: u32 },
    Seek { fd: i32, position: u32 },
    Tell { fd: i32 },
    Close { fd: i32 },
}

impl Syscall {
    /// Build the request for `nr` from its argument words.
    pub fn decode(nr: u32, args: &[Word; MAX_ARGS]) -> Option<Self> {
        let [a0, a1, a2] = *args;
        let call = match nr {
            SYS_HALT => Self::Halt,
            SYS_EXIT => Self::Exit { status: a0 as i32 },
            SYS_EXEC => Self::Exec {
                cmdline: UserAddr::new(a0),
            },
            SYS_WAIT => Self::Wait {
                pid: Pid::new(a0 as i32),
            },
            SYS_CREATE => Self::Create {
                name: UserAddr::new(a0),
                initial_size: a1,
            },
            SYS_REMOVE => Self::Remove {
                name: UserAddr::new(a0),
            },
            SYS_OPEN => Self::Open {
                name: UserAddr::new(a0),
            },
            SYS_FILESIZE => Self::Filesize { fd: a0 as i32 },
            SYS_READ => Self::Read {
                fd: a0 as i32,
                buf: UserAddr::new(a1),
                size: a2,
            },
            SYS_WRITE => Self::Write {
                fd: a0 as i32,
                buf: UserAddr::new(a1),
                size: a2,
            },
            SYS_SEEK => Self::Seek {
                fd: a0 as i32,
                position: a1,
            },
            SYS_TELL => Self::Tell { fd: a0 as i32 },
            SYS_CLOSE => Self::Close { fd: a0 as i32 },
            _ => return None,
        };
        Some(call)
    }

    /// Whether the call leaves a value in the result register.
    pub const fn has_result(&self) -> bool {
        !matches!(
            self,
            Self::Halt | Self::Exit { .. } | Self::Seek { .. } | Self::Close { .. }
        )
    }

    /// Name of the call, for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Halt => "halt",
            Self::Exit { .. } => "exit",
            Self::Exec { .. } => "exec",
            Self::Wait { .. } => "wait",
            Self::Create { .. } => "create",
            Self::Remove { .. } => "remove",
            Self::Open { .. } => "open",
            Self::Filesize { .. } => "filesize",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Seek { .. } => "seek",
            Self::Tell { .. } => "tell",
            Self::Close { .. } => "close",
        }
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
