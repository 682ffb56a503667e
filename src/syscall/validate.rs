//! System Call Input Validation
//!
//! Every address a user program hands the kernel passes through here
//! before anything is read from or written to it.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: deny by default
//! - Prevent common vulnerabilities:
//!   - Kernel memory disclosure (user/kernel split check)
//!   - Faults inside the kernel (every touched page must be mapped)
//!   - Writes into program text (store targets must be writable)
//!   - TOCTOU races (strings are copied to kernel memory once)
//!   - Null pointer dereference (explicit checks)

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::mm::address::PAGE_SHIFT;
use crate::mm::{AddressSpace, MapFlags, UserAddr, PAGE_SIZE};

use super::error::Fault;

/// Longest string argument accepted, excluding the terminator.
pub const MAX_USER_STR: usize = PAGE_SIZE;

/// Direction of a kernel access to user memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The kernel reads the range (e.g. the source of `write`).
    Read,
    /// The kernel stores into the range (e.g. the target of `read`).
    Write,
}

/// Check a single user address.
///
/// Fails if the address is outside the user half, or if its page is not
/// mapped in `space`. Returns the page's flags.
pub fn validate(space: &dyn AddressSpace, addr: UserAddr) -> Result<MapFlags, Fault> {
    if !addr.is_user() {
        return Err(Fault::BadAddress(addr));
    }
    space.lookup(addr).ok_or(Fault::Unmapped(addr))
}

/// Check every page touched by `len` bytes at `addr`.
///
/// A zero-length range is checked at its start address only.
fn validate_range(
    space: &dyn AddressSpace,
    addr: UserAddr,
    len: usize,
    access: Access,
) -> Result<(), Fault> {
    if addr.is_null() {
        return Err(Fault::NullPointer);
    }
    let last = addr
        .checked_add(len.saturating_sub(1))
        .ok_or(Fault::BadAddress(addr))?;

    let first_page = addr.page_number();
    for vpn in first_page..=last.page_number() {
        let probe = if vpn == first_page {
            addr
        } else {
            UserAddr::new(vpn << PAGE_SHIFT)
        };
        let flags = validate(space, probe)?;
        if access == Access::Write && !flags.contains(MapFlags::WRITABLE) {
            return Err(Fault::ReadOnly(probe));
        }
    }
    Ok(())
}

/// A validated user-space buffer the kernel may read
///
/// Only constructed by [`validate_user_read`], so every page in the range
/// was mapped when the syscall started.
#[derive(Debug, Clone, Copy)]
pub struct UserBuffer {
    addr: UserAddr,
    len: usize,
}

impl UserBuffer {
    /// Start address.
    pub fn addr(&self) -> UserAddr {
        self.addr
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Copy the buffer into kernel memory.
    pub fn copy_in(&self, space: &dyn AddressSpace) -> Result<Vec<u8>, Fault> {
        let mut data = vec![0u8; self.len];
        space.read(self.addr, &mut data)?;
        Ok(data)
    }
}

/// A validated, writable user-space buffer
#[derive(Debug, Clone, Copy)]
pub struct UserBufferMut {
    addr: UserAddr,
    len: usize,
}

impl UserBufferMut {
    /// Start address.
    pub fn addr(&self) -> UserAddr {
        self.addr
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store `bytes` at `offset` within the buffer.
    ///
    /// Anything past the end of the buffer is dropped.
    pub fn copy_out(
        &self,
        space: &mut dyn AddressSpace,
        offset: usize,
        bytes: &[u8],
    ) -> Result<usize, Fault> {
        let room = self.len.saturating_sub(offset);
        let n = bytes.len().min(room);
        if n == 0 {
            return Ok(0);
        }
        let at = self
            .addr
            .checked_add(offset)
            .ok_or(Fault::BadAddress(self.addr))?;
        space.write(at, &bytes[..n])?;
        Ok(n)
    }
}

/// Validate a user-space buffer the kernel will read from
///
/// # Security Checks
/// 1. Pointer is not null
/// 2. Pointer + length doesn't overflow
/// 3. Every page in the range is in user space and mapped
pub fn validate_user_read(
    space: &dyn AddressSpace,
    addr: UserAddr,
    len: usize,
) -> Result<UserBuffer, Fault> {
    validate_range(space, addr, len, Access::Read)?;
    Ok(UserBuffer { addr, len })
}

/// Validate a user-space buffer the kernel will write into
///
/// Same as read validation, plus every page must be writable.
pub fn validate_user_write(
    space: &dyn AddressSpace,
    addr: UserAddr,
    len: usize,
) -> Result<UserBufferMut, Fault> {
    validate_range(space, addr, len, Access::Write)?;
    Ok(UserBufferMut { addr, len })
}

/// Copy a NUL-terminated user string into kernel memory.
///
/// Each page is validated before it is read, so a string that runs off
/// the end of mapped memory faults instead of reading past it.
pub fn read_user_str(space: &dyn AddressSpace, addr: UserAddr) -> Result<String, Fault> {
    if addr.is_null() {
        return Err(Fault::NullPointer);
    }

    let mut bytes = Vec::new();
    let mut page_buf = [0u8; PAGE_SIZE];
    let mut cur = addr;
    loop {
        validate(space, cur)?;
        let chunk = &mut page_buf[..cur.bytes_to_page_end()];
        space.read(cur, chunk)?;

        if let Some(nul) = chunk.iter().position(|&b| b == 0) {
            bytes.extend_from_slice(&chunk[..nul]);
            break;
        }
        bytes.extend_from_slice(chunk);
        if bytes.len() > MAX_USER_STR {
            return Err(Fault::BadString(addr));
        }
        cur = cur.checked_add(chunk.len()).ok_or(Fault::BadAddress(cur))?;
    }

    if bytes.len() > MAX_USER_STR {
        return Err(Fault::BadString(addr));
    }
    String::from_utf8(bytes).map_err(|_| Fault::BadString(addr))
}
