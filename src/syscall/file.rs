//! File system calls
//!
//! create, remove, open, filesize, read, write, seek, tell, close.
//!
//! Every filesystem access, including reads and writes on files that are
//! already open, runs under the kernel's [`FsLock`](crate::fs::FsLock)
//! guard. Console I/O on descriptors 0 and 1 does not take it.

use alloc::vec::Vec;

use log::debug;

use crate::kernel::Kernel;
use crate::mm::{UserAddr, PAGE_SIZE};
use crate::process::{Fd, Process};

use super::error::Fault;
use super::validate::{read_user_str, validate_user_read, validate_user_write, UserBufferMut};

/// Result word for a recoverable failure.
const FAILED: i32 = -1;

/// Descriptor that must name an open file, or the caller dies.
fn file_fd(raw: i32) -> Result<Fd, Fault> {
    Fd::new(raw)
        .filter(|fd| !fd.is_console())
        .ok_or(Fault::BadDescriptor(raw))
}

/// create(name, initial_size) -> bool
pub fn sys_create(
    kernel: &Kernel,
    process: &mut Process,
    name: UserAddr,
    initial_size: u32,
) -> Result<i32, Fault> {
    let name = read_user_str(process.space(), name)?;
    let created = kernel.fs().lock().create(&name, initial_size);
    Ok(created as i32)
}

/// remove(name) -> bool
pub fn sys_remove(kernel: &Kernel, process: &mut Process, name: UserAddr) -> Result<i32, Fault> {
    let name = read_user_str(process.space(), name)?;
    let removed = kernel.fs().lock().remove(&name);
    Ok(removed as i32)
}

/// open(name) -> fd or -1
pub fn sys_open(kernel: &Kernel, process: &mut Process, name: UserAddr) -> Result<i32, Fault> {
    let name = read_user_str(process.space(), name)?;
    if name.is_empty() {
        return Ok(FAILED);
    }

    let mut fs = kernel.fs().lock();
    let Some(mut file) = fs.open(&name) else {
        return Ok(FAILED);
    };
    if process.executable_inode() == Some(file.inode()) {
        file.deny_write();
    }
    match process.files_mut().insert(file) {
        Ok(fd) => {
            debug!("[SYSCALL] {}: open {:?} -> {}", process.pid(), name, fd);
            Ok(fd.as_i32())
        }
        Err(err) => {
            debug!("[SYSCALL] {}: open {:?}: {}", process.pid(), name, err);
            Ok(FAILED)
        }
    }
}

/// filesize(fd) -> bytes
pub fn sys_filesize(kernel: &Kernel, process: &mut Process, fd: i32) -> Result<i32, Fault> {
    let slot = file_fd(fd)?;
    let _fs = kernel.fs().lock();
    let file = process
        .files_mut()
        .get_mut(slot)
        .map_err(|_| Fault::BadDescriptor(fd))?;
    Ok(file.length() as i32)
}

/// read(fd, buf, size) -> bytes read or -1
pub fn sys_read(
    kernel: &Kernel,
    process: &mut Process,
    fd: i32,
    buf: UserAddr,
    size: u32,
) -> Result<i32, Fault> {
    let buffer = validate_user_write(process.space(), buf, size as usize)?;
    let slot = Fd::new(fd)
        .filter(|&slot| slot != Fd::STDOUT)
        .ok_or(Fault::BadDescriptor(fd))?;

    if slot == Fd::STDIN {
        return read_console(kernel, process, &buffer);
    }

    let _fs = kernel.fs().lock();
    let mut chunk = [0u8; PAGE_SIZE];
    let mut total = 0;
    while total < buffer.len() {
        let want = (buffer.len() - total).min(PAGE_SIZE);
        let got = match process.files_mut().get_mut(slot) {
            Ok(file) => file.read(&mut chunk[..want]),
            Err(_) => return Ok(FAILED),
        };
        buffer.copy_out(process.space_mut(), total, &chunk[..got])?;
        total += got;
        if got < want {
            break;
        }
    }
    Ok(total as i32)
}

/// Read one line from the keyboard into `buffer`.
///
/// Stops at a newline (not stored) or after `len - 1` bytes, and
/// NUL-terminates what was read.
fn read_console(
    kernel: &Kernel,
    process: &mut Process,
    buffer: &UserBufferMut,
) -> Result<i32, Fault> {
    let limit = buffer.len().saturating_sub(1);
    let mut line = Vec::with_capacity(limit);
    while line.len() < limit {
        let c = kernel.console().get_char();
        if c == b'\n' {
            break;
        }
        line.push(c);
    }
    let count = line.len();
    line.push(0);
    buffer.copy_out(process.space_mut(), 0, &line)?;
    Ok(count as i32)
}

/// write(fd, buf, size) -> bytes written or -1
pub fn sys_write(
    kernel: &Kernel,
    process: &mut Process,
    fd: i32,
    buf: UserAddr,
    size: u32,
) -> Result<i32, Fault> {
    if buf.is_null() {
        return Err(Fault::NullPointer);
    }
    let buffer = validate_user_read(process.space(), buf, size as usize)?;
    let Some(slot) = Fd::new(fd).filter(|&slot| slot != Fd::STDIN) else {
        return Ok(FAILED);
    };
    let bytes = buffer.copy_in(process.space())?;

    if slot == Fd::STDOUT {
        kernel.console().put_buffer(&bytes);
        return Ok(size as i32);
    }

    let _fs = kernel.fs().lock();
    let Ok(file) = process.files_mut().get_mut(slot) else {
        return Ok(FAILED);
    };
    let written = file.write(&bytes);
    file.allow_write();
    Ok(written as i32)
}

/// seek(fd, position)
pub fn sys_seek(
    kernel: &Kernel,
    process: &mut Process,
    fd: i32,
    position: u32,
) -> Result<(), Fault> {
    let slot = file_fd(fd)?;
    let _fs = kernel.fs().lock();
    let file = process
        .files_mut()
        .get_mut(slot)
        .map_err(|_| Fault::BadDescriptor(fd))?;
    file.seek(position);
    Ok(())
}

/// tell(fd) -> position
pub fn sys_tell(kernel: &Kernel, process: &mut Process, fd: i32) -> Result<i32, Fault> {
    let slot = file_fd(fd)?;
    let _fs = kernel.fs().lock();
    let file = process
        .files_mut()
        .get_mut(slot)
        .map_err(|_| Fault::BadDescriptor(fd))?;
    Ok(file.tell() as i32)
}

/// close(fd)
///
/// Closing a descriptor that is not open is a no-op.
pub fn sys_close(kernel: &Kernel, process: &mut Process, fd: i32) -> Result<(), Fault> {
    let slot = Fd::new(fd).ok_or(Fault::BadDescriptor(fd))?;
    let _fs = kernel.fs().lock();
    match process.files_mut().remove(slot) {
        Ok(file) => drop(file),
        Err(err) => debug!("[SYSCALL] {}: close {}: {}", process.pid(), slot, err),
    }
    Ok(())
}
