//! File Descriptor Table
//!
//! A per-process, fixed-capacity table mapping descriptors to open files.
//!
//! # Design
//! - Fixed-size array of slots, addressed by [`Fd`] indices
//! - Slots 0 and 1 belong to the console and never hold a file
//! - Allocation always picks the lowest free slot
//! - Removing a slot hands the handle back; dropping it closes the file

use core::fmt;

use crate::fs::FileHandle;

/// Number of slots in a descriptor table.
pub const FD_CAPACITY: usize = 128;

/// A descriptor index.
///
/// This is a newtype so raw integers from user space must pass a bounds
/// check before they can index a table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Fd(u32);

impl Fd {
    /// Standard input (console keyboard).
    pub const STDIN: Self = Self(0);

    /// Standard output (console display).
    pub const STDOUT: Self = Self(1);

    /// First descriptor that can name a file.
    pub const FIRST_FILE: Self = Self(2);

    /// Create a descriptor from a raw user value.
    ///
    /// Returns `None` if the value is negative or beyond the table.
    #[inline]
    pub const fn new(raw: i32) -> Option<Self> {
        if raw >= 0 && (raw as usize) < FD_CAPACITY {
            Some(Self(raw as u32))
        } else {
            None
        }
    }

    /// Get the slot index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The value handed back to user space.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }

    /// Check if this is one of the console descriptors.
    #[inline]
    pub const fn is_console(self) -> bool {
        self.0 < Self::FIRST_FILE.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// The descriptor names a console stream, not a table slot.
    Reserved,
    /// The slot holds no open file.
    SlotEmpty,
    /// Every slot is in use.
    TableFull,
}

impl fmt::Display for FdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "descriptor reserved for the console"),
            Self::SlotEmpty => write!(f, "descriptor not open"),
            Self::TableFull => write!(f, "no free descriptors"),
        }
    }
}

/// Descriptor table for one process.
pub struct FdTable {
    slots: [Option<FileHandle>; FD_CAPACITY],
}

impl FdTable {
    /// Create a table with only the console descriptors.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| None),
        }
    }

    /// Store `file` in the lowest free slot and return its descriptor.
    ///
    /// On `TableFull` the handle is dropped, which closes it.
    pub fn insert(&mut self, file: FileHandle) -> Result<Fd, FdError> {
        let fd = self.find_free().ok_or(FdError::TableFull)?;
        self.slots[fd.index()] = Some(file);
        Ok(fd)
    }

    /// Lowest free file slot.
    pub fn find_free(&self) -> Option<Fd> {
        (Fd::FIRST_FILE.index()..FD_CAPACITY)
            .find(|&i| self.slots[i].is_none())
            .map(|i| Fd(i as u32))
    }

    /// Look up the open file behind `fd`.
    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut FileHandle, FdError> {
        if fd.is_console() {
            return Err(FdError::Reserved);
        }
        self.slots[fd.index()].as_mut().ok_or(FdError::SlotEmpty)
    }

    /// Clear a slot and return the handle it held.
    pub fn remove(&mut self, fd: Fd) -> Result<FileHandle, FdError> {
        if fd.is_console() {
            return Err(FdError::Reserved);
        }
        self.slots[fd.index()].take().ok_or(FdError::SlotEmpty)
    }

    /// Check if `fd` names an open file.
    pub fn is_open(&self, fd: Fd) -> bool {
        !fd.is_console() && self.slots[fd.index()].is_some()
    }

    /// Number of open files.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Close every open file. Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let mut closed = 0;
        for slot in self.slots.iter_mut() {
            if slot.take().is_some() {
                closed += 1;
            }
        }
        closed
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FdTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| i);
        f.debug_set().entries(open).finish()
    }
}
