//! System Call Interface
//!
//! The boundary between user programs and the kernel.
//!
//! # Security Model
//! - Whitelist approach: only the calls in [`numbers`] exist
//! - Every user address is validated before use
//! - Invalid inputs kill the caller with status -1, never the kernel
//! - Recoverable failures come back as -1 or false
//!
//! # Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmdline) -> pid
//! - 3: wait(pid) -> status
//! - 4: create(name, size) -> bool
//! - 5: remove(name) -> bool
//! - 6: open(name) -> fd
//! - 7: filesize(fd) -> size
//! - 8: read(fd, buf, len) -> count
//! - 9: write(fd, buf, len) -> count
//! - 10: seek(fd, pos)
//! - 11: tell(fd) -> pos
//! - 12: close(fd)

pub mod args;
mod control;
pub mod error;
mod file;
mod handler;
pub mod numbers;
pub mod validate;

pub use error::Fault;
pub use handler::{dispatch, Disposition};
pub use numbers::Syscall;
pub use validate::{UserBuffer, UserBufferMut};
