//! Faults that kill the calling process

use core::fmt;

use crate::mm::{MappingError, UserAddr};

/// A fatal system-call fault.
///
/// Any of these terminates the calling process with exit status -1.
/// Recoverable failures (a missing file, an unopened descriptor on
/// read/write) never become a `Fault`; they are reported to the caller as
/// a -1 or false result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// A pointer argument was null.
    NullPointer,
    /// The address is in page 0 or in the kernel half.
    BadAddress(UserAddr),
    /// The address is in the user half but not mapped.
    Unmapped(UserAddr),
    /// The kernel was asked to store into a read-only page.
    ReadOnly(UserAddr),
    /// A string argument is unterminated, too long, or not UTF-8.
    BadString(UserAddr),
    /// A descriptor that must name an open file does not.
    BadDescriptor(i32),
    /// The syscall number is not in the table.
    UnknownSyscall(u32),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullPointer => write!(f, "null pointer argument"),
            Self::BadAddress(addr) => write!(f, "address {} outside user space", addr),
            Self::Unmapped(addr) => write!(f, "address {} not mapped", addr),
            Self::ReadOnly(addr) => write!(f, "page at {} is read-only", addr),
            Self::BadString(addr) => write!(f, "invalid string at {}", addr),
            Self::BadDescriptor(fd) => write!(f, "bad file descriptor {}", fd),
            Self::UnknownSyscall(nr) => write!(f, "unknown system call {}", nr),
        }
    }
}

impl From<MappingError> for Fault {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::NotMapped(addr) => Self::Unmapped(addr),
            MappingError::NotUserAddress(addr) | MappingError::AlreadyMapped(addr) => {
                Self::BadAddress(addr)
            }
        }
    }
}
