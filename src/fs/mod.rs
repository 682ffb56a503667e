//! Filesystem Boundary
//!
//! The on-disk filesystem is a collaborator: this crate only needs the
//! operations below. [`FsLock`] owns the filesystem and is the single
//! process-wide gate every file operation passes through.
//!
//! # Locking Rules
//! - The lock is constructed once, together with the [`Kernel`](crate::kernel::Kernel)
//! - Every filesystem call, including operations on already-open files,
//!   happens while a guard is alive
//! - Guards release on drop, so early returns cannot leak the lock
//! - Console I/O never takes this lock

use alloc::boxed::Box;
use core::fmt;

use spin::mutex::{Mutex, MutexGuard};

use crate::sync::Reschedule;

/// Identity of the on-disk object behind an open file.
///
/// Two handles alias the same file exactly when their inodes match.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct InodeId(pub u32);

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inode#{}", self.0)
    }
}

/// An open file: the underlying object plus this handle's seek offset.
///
/// Dropping the handle closes it. A handle that denied writes must lift
/// its denial when closed.
pub trait File: Send {
    /// Read at the current offset, advancing it. Returns bytes read.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Write at the current offset, advancing it. Returns bytes written,
    /// which is 0 while writes to the underlying file are denied.
    fn write(&mut self, bytes: &[u8]) -> usize;

    /// Size of the file in bytes.
    fn length(&self) -> u32;

    /// Current offset.
    fn tell(&self) -> u32;

    /// Move the offset. Seeking past the end is allowed.
    fn seek(&mut self, pos: u32);

    /// Deny writes to the underlying file until `allow_write` or close.
    fn deny_write(&mut self);

    /// Undo this handle's `deny_write`, if it made one.
    fn allow_write(&mut self);

    /// Identity of the underlying file.
    fn inode(&self) -> InodeId;
}

/// An owned open-file handle.
pub type FileHandle = Box<dyn File>;

/// Name-level filesystem operations.
pub trait Filesystem: Send {
    /// Create a file of `initial_size` bytes. Returns success.
    fn create(&mut self, name: &str, initial_size: u32) -> bool;

    /// Open a file by name.
    fn open(&mut self, name: &str) -> Option<FileHandle>;

    /// Remove a file by name. Returns success.
    fn remove(&mut self, name: &str) -> bool;
}

/// The process-wide filesystem lock.
///
/// Holding the guard gives exclusive access to the filesystem and
/// serializes every operation on open files.
pub struct FsLock {
    inner: Mutex<Box<dyn Filesystem>, Reschedule>,
}

impl FsLock {
    /// Wrap a filesystem. Called once, while building the kernel.
    pub fn new(fs: Box<dyn Filesystem>) -> Self {
        Self {
            inner: Mutex::new(fs),
        }
    }

    /// Block until the lock is free, then take it.
    pub fn lock(&self) -> MutexGuard<'_, Box<dyn Filesystem>> {
        self.inner.lock()
    }

    /// Take the lock only if it is free.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Box<dyn Filesystem>>> {
        self.inner.try_lock()
    }

    /// Whether some path currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }
}

impl fmt::Debug for FsLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}
